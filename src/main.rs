fn main() {
    lightex::cli::run();
}
