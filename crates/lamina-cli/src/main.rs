use lamina_cli::{exit_code, run};
use lamina_pipeline::CancellationToken;

fn main() {
    // Reset SIGPIPE to default behavior to prevent panic on broken pipe
    // (e.g., when piping to `head` or `less` that exits early)
    #[cfg(unix)]
    reset_sigpipe();

    let token = CancellationToken::new();
    let handler_token = token.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        eprintln!("Warning: cannot install Ctrl-C handler: {}", e);
    }

    if let Err(e) = run(std::env::args_os(), token) {
        let code = exit_code(&e);
        if code != 130 {
            eprintln!("Error: {}", e);
        }
        std::process::exit(code);
    }
}

#[cfg(unix)]
fn reset_sigpipe() {
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}
