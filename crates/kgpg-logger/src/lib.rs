use colored::Colorize;
use indicatif::ProgressBar;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

static LOG_FILE: Mutex<Option<PathBuf>> = Mutex::new(None);
static VERBOSITY: Mutex<u8> = Mutex::new(0);
static SPINNER: Mutex<Option<ProgressBar>> = Mutex::new(None);

const LOG_FILE_NAME: &str = "kgpg.log";

/// Get the current verbosity level
pub fn get_verbosity() -> u8 {
    VERBOSITY.lock().ok().map(|v| *v).unwrap_or(0)
}

/// Set the verbosity level
/// 0 = warnings and results only, 1 = debug (-v), 2 = trace (-vv)
pub fn set_verbosity(verbosity: u8) {
    if let Ok(mut v) = VERBOSITY.lock() {
        *v = verbosity;
    }
}

/// Map the verbosity level to a `tracing` filter directive
pub fn verbosity_to_filter() -> &'static str {
    match get_verbosity() {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

/// Initialize the logger with the default log file location
pub fn init_with_verbosity(verbosity: u8) -> Result<(), String> {
    set_verbosity(verbosity);
    let log_file = get_config_dir()?.join(LOG_FILE_NAME);
    init_log_file(&log_file)
}

/// Initialize the logger with an explicit log file path
pub fn init_with_log_file(verbosity: u8, log_file: &Path) -> Result<(), String> {
    set_verbosity(verbosity);
    init_log_file(log_file)
}

fn init_log_file(log_file: &Path) -> Result<(), String> {
    if let Some(parent) = log_file.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create log directory: {}", e))?;
    }

    // Truncate log file on each run (overwrite instead of append)
    if log_file.exists() {
        let _ = fs::remove_file(log_file);
    }

    let mut log_file_guard = LOG_FILE
        .lock()
        .map_err(|_| "Log file lock poisoned".to_string())?;
    *log_file_guard = Some(log_file.to_path_buf());

    Ok(())
}

/// Get the config directory path
fn get_config_dir() -> Result<PathBuf, String> {
    #[cfg(not(target_os = "windows"))]
    let config_dir = dirs::home_dir()
        .ok_or("Could not determine home directory")?
        .join(".config")
        .join("kgpg");

    #[cfg(target_os = "windows")]
    let config_dir = dirs::config_dir()
        .ok_or("Could not determine config directory")?
        .join("kgpg");

    Ok(config_dir)
}

/// Write to log file
fn write_to_log(message: &str) {
    write_to_log_with_source(message, "KGPG");
}

/// Write to log file with custom source tag
fn write_to_log_with_source(message: &str, source: &str) {
    if let Ok(log_file_guard) = LOG_FILE.lock() {
        if let Some(ref log_path) = *log_file_guard {
            if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(log_path) {
                let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
                let _ = writeln!(file, "[{}] [{}] {}", timestamp, source, message);
            }
        }
    }
}

/// Log an informational message (to console if verbose >= 1, always to file)
pub fn info(message: &str) {
    write_to_log(&format!("INFO {}", message));
    if get_verbosity() >= 1 {
        eprintln!("{}", message);
    }
}

/// Log a debug message (to console if verbose >= 1, always to file)
pub fn debug(message: &str) {
    write_to_log(&format!("DEBUG {}", message));
    if get_verbosity() >= 1 {
        eprintln!("{} {}", "DEBUG:".blue().bold(), message);
    }
}

/// Log a warning message (to both file and console)
pub fn warn(message: &str) {
    write_to_log(&format!("WARN {}", message));
    eprintln!("{} {}", "warning:".yellow().bold(), message);
}

/// Log an error message (to both file and console)
pub fn error(message: &str) {
    write_to_log(&format!("ERROR {}", message));
    eprintln!("{} {}", "Error:".red().bold(), message);
}

/// Log a success message
pub fn success(message: &str) {
    write_to_log(&format!("SUCCESS {}", message));
    let check = "\u{2714}".green().bold();
    eprintln!("{} {}", check, message);
}

/// Log a step message (important user-facing step)
pub fn step(message: &str) {
    if get_verbosity() >= 2 {
        eprintln!("TRACE: {}", message);
    }
    write_to_log(&format!("STEP: {}", message));
}

/// Capture command output and log it
pub fn capture_output(command_name: &str, output: &std::process::Output) {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    write_to_log_with_source(
        &format!(
            "COMMAND: {} (exit code: {:?})",
            command_name,
            output.status.code()
        ),
        "EXEC",
    );

    if !stdout.is_empty() {
        write_to_log_with_source(&format!("  STDOUT:\n{}", stdout), "EXEC");
    }

    if !stderr.is_empty() {
        write_to_log_with_source(&format!("  STDERR:\n{}", stderr), "EXEC");
    }
}

/// Get the log file path for display
pub fn get_log_path() -> Option<PathBuf> {
    LOG_FILE.lock().ok().and_then(|guard| guard.clone())
}

/// Print the log file path to the user
pub fn show_log_path() {
    if let Some(path) = get_log_path() {
        eprintln!("Log file: {}", path.display());
    } else if let Ok(config_dir) = get_config_dir() {
        eprintln!("Log file: {}", config_dir.join(LOG_FILE_NAME).display());
    } else {
        eprintln!("Log file location not available");
    }
}

/// Start a spinner with the given message (only if not verbose)
pub fn spinner_start(message: &str) {
    // Don't show spinner in verbose mode
    if get_verbosity() > 0 {
        return;
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template("{spinner:.cyan} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner.set_message(message.to_string());

    if let Ok(mut spinner_guard) = SPINNER.lock() {
        *spinner_guard = Some(spinner);
    }
}

/// Stop the spinner with an error message
pub fn spinner_error(message: &str) {
    spinner_stop();
    write_to_log(&format!("ERROR {}", message));
    eprintln!("  {} {}", "✗".red().bold(), message);
}

/// Stop the spinner without any message
pub fn spinner_stop() {
    if let Ok(mut spinner_guard) = SPINNER.lock() {
        if let Some(spinner) = spinner_guard.take() {
            spinner.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_file_receives_messages() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let log_path = temp_dir.path().join("logs").join("kgpg.log");

        assert!(init_with_log_file(0, &log_path).is_ok());
        assert_eq!(get_log_path().as_deref(), Some(log_path.as_path()));

        warn("pattern skipped");
        debug("resolved 3 files");

        let content = fs::read_to_string(&log_path).unwrap_or_default();
        assert!(content.contains("WARN pattern skipped"));
        assert!(content.contains("DEBUG resolved 3 files"));
        assert!(content.contains("[KGPG]"));
    }

    #[test]
    fn test_verbosity_filter_mapping() {
        set_verbosity(0);
        assert_eq!(verbosity_to_filter(), "warn");
        set_verbosity(1);
        assert_eq!(verbosity_to_filter(), "debug");
        set_verbosity(5);
        assert_eq!(verbosity_to_filter(), "trace");
        set_verbosity(0);
    }
}
