fn main() {
    gloss::cli::run();
}
