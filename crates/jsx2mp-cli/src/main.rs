fn main() {
    jsx2mp_cli::run();
}
