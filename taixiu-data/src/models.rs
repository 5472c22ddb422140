use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Binary round outcome. Tài = high total (≥11), Xỉu = low total (≤10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Tai,
    Xiu,
}

impl Outcome {
    pub fn opposite(self) -> Self {
        match self {
            Outcome::Tai => Outcome::Xiu,
            Outcome::Xiu => Outcome::Tai,
        }
    }

    /// Short symbol used in pattern strings and transition keys.
    pub fn symbol(self) -> char {
        match self {
            Outcome::Tai => 'T',
            Outcome::Xiu => 'X',
        }
    }

    /// Vietnamese label as rendered by the upstream game.
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Tai => "Tài",
            Outcome::Xiu => "Xỉu",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Normalize the source's categorical label to an outcome.
/// Case-insensitive, tolerant of both diacritic and ASCII spellings.
pub fn normalize_outcome(raw: &str) -> Option<Outcome> {
    let s = raw.trim().to_lowercase();
    match s.as_str() {
        "t" | "tai" | "tài" => Some(Outcome::Tai),
        "x" | "xiu" | "xỉu" => Some(Outcome::Xiu),
        _ => None,
    }
}

/// One element of the raw upstream feed. Field names follow the source API;
/// values are loosely typed (numbers sometimes arrive as strings) and are
/// coerced during shaping.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "Phien", default)]
    pub phien: Value,
    #[serde(rename = "Xuc_xac_1", default)]
    pub xuc_xac_1: Value,
    #[serde(rename = "Xuc_xac_2", default)]
    pub xuc_xac_2: Value,
    #[serde(rename = "Xuc_xac_3", default)]
    pub xuc_xac_3: Value,
    #[serde(rename = "Tong", default)]
    pub tong: Value,
    #[serde(rename = "Ket_qua", default)]
    pub ket_qua: Value,
}

/// One fully normalized historical round.
#[derive(Debug, Clone, Serialize)]
pub struct Round {
    pub index: i64,
    pub dice: [u8; 3],
    pub total: u8,
    pub outcome: Outcome,
}

fn coerce_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn coerce_str(v: &Value) -> Option<&str> {
    v.as_str()
}

fn normalize_record(raw: &RawRecord) -> Option<Round> {
    let index = coerce_i64(&raw.phien)?;
    let d1 = coerce_i64(&raw.xuc_xac_1)?;
    let d2 = coerce_i64(&raw.xuc_xac_2)?;
    let d3 = coerce_i64(&raw.xuc_xac_3)?;
    let total = coerce_i64(&raw.tong)?;
    let outcome = normalize_outcome(coerce_str(&raw.ket_qua)?)?;

    for d in [d1, d2, d3] {
        if !(1..=6).contains(&d) {
            return None;
        }
    }
    if !(3..=18).contains(&total) {
        return None;
    }

    Some(Round {
        index,
        dice: [d1 as u8, d2 as u8, d3 as u8],
        // The source supplies the total independently; it is trusted as-is.
        total: total as u8,
        outcome,
    })
}

/// Shape the raw feed into an ordered history: drop malformed records,
/// sort ascending by round index, drop duplicate indices (first wins).
pub fn shape_history(raw: &[RawRecord]) -> Vec<Round> {
    let mut rounds: Vec<Round> = raw.iter().filter_map(normalize_record).collect();
    let dropped = raw.len() - rounds.len();

    rounds.sort_by_key(|r| r.index);
    let before = rounds.len();
    rounds.dedup_by_key(|r| r.index);
    let dupes = before - rounds.len();

    if dropped > 0 || dupes > 0 {
        log::info!(
            "shape_history: kept {} rounds ({} malformed dropped, {} duplicate indices)",
            rounds.len(),
            dropped,
            dupes
        );
    }

    rounds
}

/// Categorical shape of the three dice of one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiceShape {
    Triple(u8),
    Pair,
    Straight,
    Mixed,
}

impl DiceShape {
    pub fn of(round: &Round) -> Self {
        let [a, b, c] = round.dice;
        if a == b && b == c {
            return DiceShape::Triple(a);
        }
        if a == b || b == c || a == c {
            return DiceShape::Pair;
        }
        let mut s = round.dice;
        s.sort_unstable();
        if s[0] + 1 == s[1] && s[1] + 1 == s[2] {
            DiceShape::Straight
        } else {
            DiceShape::Mixed
        }
    }
}

impl std::fmt::Display for DiceShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiceShape::Triple(face) => write!(f, "triple_{face}"),
            DiceShape::Pair => write!(f, "pair"),
            DiceShape::Straight => write!(f, "straight"),
            DiceShape::Mixed => write!(f, "mixed"),
        }
    }
}

/// Parity of a round's total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Parity {
    Even,
    Odd,
}

impl Parity {
    pub fn of(round: &Round) -> Self {
        if round.total % 2 == 0 {
            Parity::Even
        } else {
            Parity::Odd
        }
    }
}

impl std::fmt::Display for Parity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Parity::Even => write!(f, "even"),
            Parity::Odd => write!(f, "odd"),
        }
    }
}

/// Fixed bucketing of the total range 3–18 into five bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SumBucket {
    UpTo6,
    S7to9,
    S10to12,
    S13to15,
    S16Plus,
}

impl SumBucket {
    pub fn of(round: &Round) -> Self {
        match round.total {
            0..=6 => SumBucket::UpTo6,
            7..=9 => SumBucket::S7to9,
            10..=12 => SumBucket::S10to12,
            13..=15 => SumBucket::S13to15,
            _ => SumBucket::S16Plus,
        }
    }
}

impl std::fmt::Display for SumBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SumBucket::UpTo6 => write!(f, "<=6"),
            SumBucket::S7to9 => write!(f, "7-9"),
            SumBucket::S10to12 => write!(f, "10-12"),
            SumBucket::S13to15 => write!(f, "13-15"),
            SumBucket::S16Plus => write!(f, ">=16"),
        }
    }
}
