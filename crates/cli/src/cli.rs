use clap::{Parser, ValueEnum};
use courtsnipe::site::{SiteDescriptor, ZHONGSHAN, ZHONGZHENG};

#[derive(Parser, Debug)]
#[command(name = "courtsnipe")]
#[command(about = "Race for contested court slots the instant booking opens")]
#[command(version)]
pub struct Cli {
    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Portal to race against
    #[arg(short, long, value_enum, default_value = "zhongshan")]
    pub site: SiteKind,

    /// Override the market-open instant (YYYY-mm-ddTHH:MM:SS); test mode
    #[arg(long, value_name = "WHEN")]
    pub open_at: Option<String>,

    /// Override the slot list, comma separated (YYYY-mm-ddTHH:MM:SS,...)
    #[arg(long, value_name = "SLOTS")]
    pub slots: Option<String>,

    /// Safety interval before market-open; login happens this early
    #[arg(long, default_value = "90", value_name = "SECS")]
    pub login_margin_secs: i64,

    /// Weekday whose midnight the booking window opens on (1 = Monday .. 7 = Sunday)
    #[arg(long, default_value = "4", value_name = "ISO_DAY")]
    pub weekday: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SiteKind {
    Zhongshan,
    Zhongzheng,
}

impl SiteKind {
    pub fn descriptor(&self) -> &'static SiteDescriptor {
        match self {
            Self::Zhongshan => &ZHONGSHAN,
            Self::Zhongzheng => &ZHONGZHENG,
        }
    }
}

impl std::fmt::Display for SiteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.descriptor().name)
    }
}
