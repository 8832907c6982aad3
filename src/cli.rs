use crate::region::Region;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Default, Parser)]
#[command(name = "wrapabbr")]
#[command(version = "0.1.0")]
#[command(about = "Wrap markup with an expanded abbreviation")]
pub struct CliArgs {
    /// File to edit
    pub file: PathBuf,

    /// Abbreviation to wrap with
    #[arg(long, short = 'a')]
    pub abbreviation: String,

    /// Selection to wrap, as START:END character offsets
    #[arg(long, short = 's', value_parser = parse_selection, conflicts_with = "cursor")]
    pub selection: Option<Region>,

    /// Caret offset; the enclosing tag context is wrapped
    #[arg(long, short = 'c')]
    pub cursor: Option<usize>,

    /// Syntax to use instead of the one detected from the file extension
    #[arg(long)]
    pub syntax: Option<String>,

    /// Print the preview popup instead of editing
    #[arg(long, short = 'p')]
    pub preview: bool,

    /// Write the result back to the file instead of stdout
    #[arg(long, short = 'i')]
    pub in_place: bool,

    /// Config file (defaults to <config dir>/wrapabbr/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl CliArgs {
    /// Selection to start from: explicit range, caret, or start of file.
    pub fn initial_selection(&self) -> Region {
        self.selection
            .or_else(|| self.cursor.map(Region::point))
            .unwrap_or_default()
    }
}

pub fn parse_selection(value: &str) -> Result<Region, String> {
    let (start, end) = value
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got '{value}'"))?;
    let start: usize = start
        .trim()
        .parse()
        .map_err(|e| format!("invalid start offset '{start}': {e}"))?;
    let end: usize = end
        .trim()
        .parse()
        .map_err(|e| format!("invalid end offset '{end}': {e}"))?;
    Ok(Region::new(start, end))
}

pub fn parse_args() -> Result<CliArgs, Box<dyn std::error::Error>> {
    Ok(CliArgs::parse())
}
