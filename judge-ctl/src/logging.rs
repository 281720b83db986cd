use console::style;
use env_logger::{Builder, Env};
use log::{Level, LevelFilter};
use std::io::Write;

fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

/// Initialize logger from the `-v` count; `RUST_LOG` still wins when set
pub fn init_logger(verbosity: u8) {
    let level = level_for(verbosity);
    let env = Env::default().filter_or("RUST_LOG", level.as_str().to_lowercase());

    Builder::from_env(env)
        .format(move |buf, record| {
            let tag = match record.level() {
                Level::Error => style("ERROR").red().bold(),
                Level::Warn => style("WARN ").yellow().bold(),
                Level::Info => style("INFO ").green(),
                Level::Debug => style("DEBUG").cyan(),
                Level::Trace => style("TRACE").dim(),
            };
            if record.level() >= Level::Debug {
                writeln!(
                    buf,
                    "{} {} {}",
                    tag,
                    style(record.target()).dim(),
                    record.args()
                )
            } else {
                writeln!(buf, "{} {}", tag, record.args())
            }
        })
        .init();
}
