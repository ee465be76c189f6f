use std::process;

fn main() {
    match rainlint_cli::run() {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("rainlint error: {err}");
            process::exit(1);
        }
    }
}
