/// Display formats for metric tiles. Mirrors the unit hints carried in
/// `metrics.csv` plus the scale shortcuts used by the report layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    /// One decimal place, no suffix.
    Plain,
    /// One decimal place with a `%` suffix.
    Percent,
    /// A 0..1 ratio rendered as a percentage.
    RatioPercent,
    /// One decimal place with a literal suffix such as `k` or `mn`.
    Suffix(&'static str),
    /// Zero decimal places with a `bn` suffix.
    Billions,
    /// Divide by 10^power before rendering. Powers 3 and 6 default to the
    /// `k` and `mn` suffixes, power 9 to none; `suffix` overrides that.
    Scaled {
        power: u32,
        suffix: Option<&'static str>,
    },
}

/// Delta direction semantics for a tile. `Inverse` marks series where an
/// increase is bad news (refugee counts, inflation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaColor {
    Normal,
    Inverse,
    Off,
}

pub fn format_value(value: f64, format: ValueFormat) -> String {
    match format {
        ValueFormat::Plain => format!("{value:.1}"),
        ValueFormat::Percent => format!("{value:.1}%"),
        ValueFormat::RatioPercent => format!("{:.1}%", value * 100.0),
        ValueFormat::Suffix(suffix) => format!("{value:.1}{suffix}"),
        ValueFormat::Billions => format!("{value:.0}bn"),
        ValueFormat::Scaled { power, suffix } => {
            let scaled = value / 10f64.powi(power as i32);
            match power {
                9 => format!("{scaled:.0}{}", suffix.unwrap_or("")),
                6 => format!("{scaled:.1}{}", suffix.unwrap_or("mn")),
                _ => format!("{scaled:.1}{}", suffix.unwrap_or("k")),
            }
        }
    }
}

pub fn delta_class(change: f64, color: DeltaColor) -> &'static str {
    let improving = match color {
        DeltaColor::Normal => change > 0.0,
        DeltaColor::Inverse => change < 0.0,
        DeltaColor::Off => return "delta-neutral",
    };
    if change == 0.0 {
        "delta-neutral"
    } else if improving {
        "delta-good"
    } else {
        "delta-bad"
    }
}

pub fn delta_arrow(change: f64) -> &'static str {
    if change > 0.0 {
        "▲"
    } else if change < 0.0 {
        "▼"
    } else {
        ""
    }
}
