use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

/// Canonical vocabulary of raw statistic columns. A stat that is not present
/// in a record is *absent*, which is distinct from a measured zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawStat {
    // Shooting
    Shots,
    ShotsOnTarget,
    ShotsOnTargetPct,
    Goals,
    Assists,
    Xg,
    NpXg,
    PensMade,
    PensAttempted,
    ShotDistance,
    // Passing
    PassesCompleted,
    PassCompletionPct,
    ProgressivePasses,
    ProgressiveDistance,
    KeyPasses,
    Xa,
    PassesIntoPenaltyArea,
    // Possession
    Touches,
    Carries,
    ProgressiveCarries,
    FinalThirdEntries,
    PenaltyAreaEntries,
    SuccessfulDribbles,
    Miscontrols,
    Dispossessed,
    PassesReceived,
    ProgressiveReceptions,
    // Defense
    Tackles,
    TackleWinPct,
    Interceptions,
    Blocks,
    AttackingThirdTackles,
    // Shot creation
    ShotCreatingActions,
    ShotCreatingActionsPer90,
    GoalCreatingActions,
    GoalCreatingActionsPer90,
}

impl RawStat {
    /// Map a source column header to a canonical stat. Headers follow the
    /// fbref table naming; unknown columns are ignored by the loader.
    pub fn from_column(header: &str) -> Option<Self> {
        Some(match header.trim() {
            "Sh" => Self::Shots,
            "SoT" => Self::ShotsOnTarget,
            "SoT%" => Self::ShotsOnTargetPct,
            "Gls" => Self::Goals,
            "Ast" => Self::Assists,
            "xG" => Self::Xg,
            "npxG" => Self::NpXg,
            "PK" => Self::PensMade,
            "PKatt" => Self::PensAttempted,
            "Dist" => Self::ShotDistance,
            "Cmp" | "total_cmp" => Self::PassesCompleted,
            "Cmp%" | "total_Cmp%" => Self::PassCompletionPct,
            "PrgP" => Self::ProgressivePasses,
            "PrgDist" => Self::ProgressiveDistance,
            "KP" => Self::KeyPasses,
            "xA" => Self::Xa,
            "PPA" => Self::PassesIntoPenaltyArea,
            "Touches" => Self::Touches,
            "Carries" => Self::Carries,
            "PrgC" => Self::ProgressiveCarries,
            "1/3" => Self::FinalThirdEntries,
            "CPA" => Self::PenaltyAreaEntries,
            "Succ" => Self::SuccessfulDribbles,
            "Mis" => Self::Miscontrols,
            "Dis" => Self::Dispossessed,
            "Rec" => Self::PassesReceived,
            "PrgR" => Self::ProgressiveReceptions,
            "Tkl" => Self::Tackles,
            "Tkl%" => Self::TackleWinPct,
            "Int" => Self::Interceptions,
            "Blocks" => Self::Blocks,
            "Att 3rd" => Self::AttackingThirdTackles,
            "SCA" => Self::ShotCreatingActions,
            "SCA90" => Self::ShotCreatingActionsPer90,
            "GCA" => Self::GoalCreatingActions,
            "GCA90" => Self::GoalCreatingActionsPer90,
            _ => return None,
        })
    }
}

/// Player age as reported by the source: completed years plus days since the
/// last birthday ("24-104"). A bare year count is accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Age {
    pub years: u32,
    pub days: u32,
}

impl Age {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("empty age value"));
        }
        let (years_part, days_part) = match trimmed.split_once('-') {
            Some((y, d)) => (y, Some(d)),
            None => (trimmed, None),
        };
        let years = years_part
            .trim()
            .parse::<u32>()
            .map_err(|_| anyhow!("malformed age string {trimmed:?}"))?;
        let days = match days_part {
            Some(d) => d
                .trim()
                .parse::<u32>()
                .map_err(|_| anyhow!("malformed age string {trimmed:?}"))?,
            None => 0,
        };
        Ok(Self { years, days })
    }
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.years)
    }
}

/// One row of the source dataset: a (player, squad) pair in one snapshot.
/// The same player may appear under several squads after a transfer; rows
/// are never merged.
#[derive(Debug, Clone)]
pub struct PlayerRecord {
    pub name: String,
    pub squad: String,
    pub position: String,
    pub age: Age,
    /// Playing time as an equivalent number of full 90-minute matches.
    pub ninety: f64,
    stats: HashMap<RawStat, f64>,
}

impl PlayerRecord {
    pub fn new(
        name: impl Into<String>,
        squad: impl Into<String>,
        position: impl Into<String>,
        age: Age,
        ninety: f64,
    ) -> Self {
        Self {
            name: name.into(),
            squad: squad.into(),
            position: position.into(),
            age,
            ninety,
            stats: HashMap::new(),
        }
    }

    pub fn set_stat(&mut self, stat: RawStat, value: f64) {
        self.stats.insert(stat, value);
    }

    pub fn with_stat(mut self, stat: RawStat, value: f64) -> Self {
        self.set_stat(stat, value);
        self
    }

    /// Raw value, `None` when the column was absent or unparseable.
    pub fn stat(&self, stat: RawStat) -> Option<f64> {
        self.stats.get(&stat).copied()
    }

    /// Raw value with absent treated as zero. Only for ratio formulas whose
    /// reference behavior zero-fills; normalization paths keep the absence.
    pub fn stat_or_zero(&self, stat: RawStat) -> f64 {
        self.stat(stat).unwrap_or(0.0)
    }

    /// Value scaled to a per-match rate. A zero `ninety` propagates the
    /// resulting infinity; eligibility filtering is expected to have removed
    /// such rows beforehand.
    pub fn per90(&self, stat: RawStat) -> Option<f64> {
        self.stat(stat).map(|v| v / self.ninety)
    }
}

/// The stat tables the analyses draw from, one CSV file each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatTable {
    Passing,
    Shooting,
    Possession,
    Defense,
    ShotCreation,
}

impl StatTable {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Passing => "passing.csv",
            Self::Shooting => "shooting.csv",
            Self::Possession => "possession.csv",
            Self::Defense => "defense.csv",
            Self::ShotCreation => "shot_creation.csv",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Passing => "passing",
            Self::Shooting => "shooting",
            Self::Possession => "possession",
            Self::Defense => "defense",
            Self::ShotCreation => "shot_creation",
        }
    }
}

const REQUIRED_COLUMNS: [&str; 5] = ["Player", "Squad", "Pos", "Age", "90s"];

/// Parse one stat table from CSV. Identity columns are required; stat
/// columns are picked up by header name, first occurrence winning when the
/// source repeats a header (the later duplicates are split/medium/long
/// breakdowns or challenge counts).
pub fn load_table(path: &Path, table: StatTable) -> Result<Vec<PlayerRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("open {} table {}", table.label(), path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("read {} header row", table.label()))?
        .clone();

    let mut identity_idx: HashMap<&str, usize> = HashMap::new();
    let mut stat_columns: Vec<(usize, RawStat)> = Vec::new();
    let mut seen_stats: HashSet<RawStat> = HashSet::new();

    for (idx, header) in headers.iter().enumerate() {
        let header = header.trim();
        if REQUIRED_COLUMNS.contains(&header) {
            identity_idx.entry(header).or_insert(idx);
            continue;
        }
        if let Some(stat) = RawStat::from_column(header) {
            if seen_stats.insert(stat) {
                stat_columns.push((idx, stat));
            }
        }
    }

    for required in REQUIRED_COLUMNS {
        if !identity_idx.contains_key(required) {
            return Err(anyhow!(
                "missing required column {required:?} in {} table {}",
                table.label(),
                path.display()
            ));
        }
    }

    let player_idx = identity_idx["Player"];
    let squad_idx = identity_idx["Squad"];
    let pos_idx = identity_idx["Pos"];
    let age_idx = identity_idx["Age"];
    let ninety_idx = identity_idx["90s"];
    let field = |row: &csv::StringRecord, idx: usize| -> String {
        row.get(idx).unwrap_or("").trim().to_string()
    };

    let mut records = Vec::new();
    for (row_no, row) in reader.records().enumerate() {
        let row = row.with_context(|| {
            format!("read {} table row {}", table.label(), row_no + 2)
        })?;

        let name = field(&row, player_idx);
        // The source occasionally repeats the header as a data row.
        if name.is_empty() || name == "Player" {
            continue;
        }

        let age = Age::parse(&field(&row, age_idx)).with_context(|| {
            format!("field Age for player {name:?} in {} table", table.label())
        })?;
        let raw_ninety = field(&row, ninety_idx);
        let ninety = parse_cell(&raw_ninety).ok_or_else(|| {
            anyhow!(
                "field 90s for player {name:?} in {} table: {raw_ninety:?} is not numeric",
                table.label(),
            )
        })?;

        let mut record = PlayerRecord::new(
            name,
            field(&row, squad_idx),
            field(&row, pos_idx),
            age,
            ninety,
        );
        for &(idx, stat) in &stat_columns {
            let Some(cell) = row.get(idx) else { continue };
            if let Some(value) = parse_cell(cell) {
                record.set_stat(stat, value);
            }
        }
        records.push(record);
    }

    Ok(records)
}

/// Lenient numeric cell parse. Blank and dash cells are absent, not zero.
fn parse_cell(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }
    let cleaned = trimmed.trim_end_matches('%').replace(',', "");
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Loads stat tables from a dataset directory, caching parsed tables so the
/// basic/advanced/shooting pipelines of one invocation share a single read.
pub struct DataLoader {
    data_dir: PathBuf,
    cache_enabled: bool,
    cache: HashMap<StatTable, Vec<PlayerRecord>>,
}

impl DataLoader {
    pub fn new(data_dir: impl Into<PathBuf>, cache_enabled: bool) -> Self {
        Self {
            data_dir: data_dir.into(),
            cache_enabled,
            cache: HashMap::new(),
        }
    }

    pub fn get(&mut self, table: StatTable, force_reload: bool) -> Result<Vec<PlayerRecord>> {
        if self.cache_enabled && !force_reload {
            if let Some(cached) = self.cache.get(&table) {
                tracing::debug!(table = table.label(), "using cached table");
                return Ok(cached.clone());
            }
        }
        let path = self.data_dir.join(table.file_name());
        tracing::info!(table = table.label(), path = %path.display(), "loading table");
        let records = load_table(&path, table)?;
        if self.cache_enabled {
            self.cache.insert(table, records.clone());
        }
        Ok(records)
    }
}
