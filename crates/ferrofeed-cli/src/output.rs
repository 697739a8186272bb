use std::io::{self, Write};

use ferrofeed_core::PriceFrame;
use serde::Serialize;

use crate::error::CliError;

pub fn render_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    if pretty {
        serde_json::to_writer_pretty(&mut stdout, value)?;
    } else {
        serde_json::to_writer(&mut stdout, value)?;
    }
    writeln!(stdout)?;
    Ok(())
}

pub fn render_price_table(frame: &PriceFrame) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(price_table(frame).as_bytes())?;
    Ok(())
}

fn price_table(frame: &PriceFrame) -> String {
    let mut out = format!(
        "{:<16} {:>12} {:>12} {:>12} {:>12} {:>16}\n",
        "time", "open", "high", "low", "close", "volume"
    );
    for position in 0..frame.len() {
        let Some((time, [open, high, low, close, volume])) = frame.row(position) else {
            continue;
        };
        out.push_str(&format!(
            "{:<16} {open:>12.4} {high:>12.4} {low:>12.4} {close:>12.4} {volume:>16.0}\n",
            time.to_compact()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use ferrofeed_core::{MarketTime, PricePoint};
    use time::macros::date;

    use super::*;

    #[test]
    fn table_has_header_and_one_line_per_bar() {
        let point = PricePoint::new(MarketTime::day(date!(2024 - 01 - 02)), 10.0, 11.0, 9.5, 10.5, 1_200)
            .expect("point");
        let table = price_table(&PriceFrame::from_points(&[point]));
        let lines = table.lines().collect::<Vec<_>>();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("time"));
        assert!(lines[1].starts_with("20240102"));
        assert!(lines[1].ends_with("1200"));
    }
}
