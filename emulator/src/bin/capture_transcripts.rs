use std::io;
use std::path::PathBuf;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::Session;

const TRANSCRIPT_DIR: &str = "transcripts";

/// Scripted sessions replayed into `transcripts/<name>.log`.
const SCENARIOS: &[(&str, &[&str])] = &[
    (
        "countdown",
        &[
            "adc 1800",
            "tick 3",
            "press t10",
            "advance 10s",
            "status",
            "advance 1s",
            "log",
        ],
    ),
    (
        "power-toggle",
        &[
            "adc 3200",
            "press t30",
            "advance 2500ms",
            "press power",
            "status",
            "press t20",
            "advance 1s",
            "press power",
            "tick 2",
            "status",
        ],
    ),
    (
        "bounce",
        &[
            "press t20",
            "advance 12ms",
            "press t20",
            "advance 30ms",
            "press t20",
            "advance 50ms",
            "press t20",
            "log",
        ],
    ),
    (
        "display-fault",
        &[
            "adc 900",
            "display fail",
            "advance 1s",
            "display ok",
            "advance 500ms",
            "log",
        ],
    ),
];

fn main() -> io::Result<()> {
    for (name, commands) in SCENARIOS {
        record_scenario(name, commands)?;
    }
    Ok(())
}

fn record_scenario(name: &str, commands: &[&str]) -> io::Result<()> {
    let path = PathBuf::from(TRANSCRIPT_DIR).join(format!("{name}.log"));
    let mut session = Session::new(Some(&path))?;
    session.boot()?;
    for command in commands {
        let _ = session.handle_command(command)?;
    }
    println!("wrote {}", path.display());
    Ok(())
}
