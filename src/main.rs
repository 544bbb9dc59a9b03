fn main() {
    let code = hostprep::commands::handle_args(std::env::args_os());
    std::process::exit(code);
}
