use crossterm::{
    cursor, execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use miette::IntoDiagnostic;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};

pub fn setup_terminal() -> miette::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().into_diagnostic()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).into_diagnostic()?;

    Terminal::new(CrosstermBackend::new(stdout)).into_diagnostic()
}

pub fn restore_terminal() -> miette::Result<()> {
    disable_raw_mode().into_diagnostic()?;
    execute!(io::stdout(), LeaveAlternateScreen, cursor::Show).into_diagnostic()?;

    Ok(())
}
