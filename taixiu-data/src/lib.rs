pub mod models;

pub use models::{shape_history, DiceShape, Outcome, Parity, RawRecord, Round, SumBucket};
