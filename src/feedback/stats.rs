//! Aggregate counts over the feedback directory tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::record::FeedbackStatus;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassFeedbackStats {
    pub total: usize,
    pub correct: usize,
    pub corrected: usize,
}

impl ClassFeedbackStats {
    pub fn add(&mut self, status: Option<FeedbackStatus>) {
        self.total += 1;
        match status {
            Some(FeedbackStatus::Correct) => self.correct += 1,
            Some(FeedbackStatus::Corrected) => self.corrected += 1,
            None => {}
        }
    }
}

/// Feedback counts per class name and overall
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub total: usize,
    pub by_class: BTreeMap<String, ClassFeedbackStats>,
    pub correct_predictions: usize,
    pub corrected_predictions: usize,
}

impl FeedbackStats {
    pub fn insert_class(&mut self, class_name: &str, class_stats: ClassFeedbackStats) {
        self.total += class_stats.total;
        self.correct_predictions += class_stats.correct;
        self.corrected_predictions += class_stats.corrected;
        self.by_class.insert(class_name.to_string(), class_stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_accumulate_across_classes() {
        let mut female = ClassFeedbackStats::default();
        female.add(Some(FeedbackStatus::Correct));
        female.add(Some(FeedbackStatus::Corrected));
        let mut male = ClassFeedbackStats::default();
        male.add(Some(FeedbackStatus::Correct));
        male.add(None);

        let mut stats = FeedbackStats::default();
        stats.insert_class("Female", female);
        stats.insert_class("Male", male);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.correct_predictions, 2);
        assert_eq!(stats.corrected_predictions, 1);
        assert_eq!(stats.by_class["Male"].total, 2);
    }
}
