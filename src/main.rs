fn main() {
    std::process::exit(rhake::run());
}
