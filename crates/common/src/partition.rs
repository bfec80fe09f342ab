use std::collections::BTreeMap;

use crate::model::{Prom, PromRules, Rules};

impl Rules {
    /// Splits the collection by owning instance.
    ///
    /// Stable: rules keep their relative input order inside each partition.
    /// Partitions come out in ascending `prom_id` order and carry a `Prom`
    /// with only the id set; callers fill in the URL from their own
    /// instance directory.
    pub fn prom_rules(&self) -> Vec<PromRules> {
        let mut by_prom: BTreeMap<i64, Rules> = BTreeMap::new();
        for rule in self {
            by_prom.entry(rule.prom_id).or_default().push(rule.clone());
        }

        tracing::debug!(
            rules = self.len(),
            partitions = by_prom.len(),
            "partitioned rules by prom_id"
        );

        by_prom
            .into_iter()
            .map(|(id, rules)| PromRules {
                prom: Prom::with_id(id),
                rules,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{Rule, Rules};

    fn rule(id: i64, prom_id: i64) -> Rule {
        Rule {
            id,
            prom_id,
            ..Default::default()
        }
    }

    #[test]
    fn empty_input_no_partitions() {
        assert!(Rules::new().prom_rules().is_empty());
    }

    #[test]
    fn two_instances() {
        let rules: Rules = vec![rule(1, 10), rule(2, 20), rule(3, 10)].into();
        let parts = rules.prom_rules();
        assert_eq!(parts.len(), 2);

        let ten = parts.iter().find(|p| p.prom.id == 10).unwrap();
        let twenty = parts.iter().find(|p| p.prom.id == 20).unwrap();
        assert_eq!(ten.rules.len(), 2);
        assert_eq!(twenty.rules.len(), 1);
        assert!(ten.prom.url.is_empty());
    }

    #[test]
    fn stable_within_partition() {
        let rules: Rules = vec![rule(9, 1), rule(2, 2), rule(4, 1), rule(1, 1)].into();
        let parts = rules.prom_rules();
        let ids: Vec<i64> = parts[0].rules.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![9, 4, 1]);
    }

    #[test]
    fn every_rule_lands_in_its_partition() {
        let rules: Rules = (0..50).map(|i| rule(i, i % 7)).collect();
        let parts = rules.prom_rules();

        let total: usize = parts.iter().map(|p| p.rules.len()).sum();
        assert_eq!(total, rules.len());
        for p in &parts {
            assert!(p.rules.iter().all(|r| r.prom_id == p.prom.id));
        }

        let mut seen: Vec<i64> = parts.iter().flat_map(|p| p.rules.iter().map(|r| r.id)).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn zero_prom_id_is_a_regular_key() {
        let rules: Rules = vec![rule(1, 0), rule(2, 0)].into();
        let parts = rules.prom_rules();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].prom.id, 0);
        assert_eq!(parts[0].rules.len(), 2);
    }

    #[test]
    fn partitions_sorted_by_prom_id() {
        let rules: Rules = vec![rule(1, 30), rule(2, 10), rule(3, 20)].into();
        let ids: Vec<i64> = rules.prom_rules().iter().map(|p| p.prom.id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }

    #[test]
    fn input_left_untouched() {
        let rules: Rules = vec![rule(1, 30), rule(2, 10)].into();
        let before = rules.clone();
        let _ = rules.prom_rules();
        assert_eq!(rules, before);
    }
}
