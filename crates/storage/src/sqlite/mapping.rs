use practice_core::model::Difficulty;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn difficulty_str(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Basic => "basic",
        Difficulty::Medium => "medium",
        Difficulty::Advanced => "advanced",
    }
}

pub(crate) fn parse_difficulty(s: &str) -> Result<Difficulty, StorageError> {
    match s {
        "basic" => Ok(Difficulty::Basic),
        "medium" => Ok(Difficulty::Medium),
        "advanced" => Ok(Difficulty::Advanced),
        _ => Err(StorageError::Serialization(format!("invalid difficulty: {s}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_text_round_trips() {
        for d in [Difficulty::Basic, Difficulty::Medium, Difficulty::Advanced] {
            assert_eq!(parse_difficulty(difficulty_str(d)).unwrap(), d);
        }
        assert!(parse_difficulty("expert").is_err());
    }

    #[test]
    fn negative_counts_are_rejected() {
        assert!(u32_from_i64("total_questions", -1).is_err());
        assert_eq!(u32_from_i64("total_questions", 7).unwrap(), 7);
    }
}
