use crate::animal::{Animal, AnimalKind};
use crate::zoo::Zoo;

#[derive(Debug, Clone, PartialEq)]
pub struct KindSummary {
    pub kind: AnimalKind,
    pub count: usize,
    pub average_age: f64,
}

/// Aggregate view of the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ZooStatistics {
    /// Only kinds that have at least one animal, in `AnimalKind::ALL` order.
    pub by_kind: Vec<KindSummary>,
    /// Up to three oldest animals, oldest first.
    pub oldest: Vec<(String, u8)>,
    /// Occupied enclosures with their member count.
    pub per_enclosure: Vec<(String, usize)>,
    pub total: usize,
    pub average_age: f64,
    pub erratic_capable: usize,
    pub can_fly: usize,
}

impl ZooStatistics {
    pub fn collect(zoo: &Zoo) -> Self {
        let animals = zoo.animals();

        let by_kind = AnimalKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let ages: Vec<f64> = animals
                    .iter()
                    .filter(|a| a.kind() == kind)
                    .map(|a| f64::from(a.age()))
                    .collect();
                (!ages.is_empty()).then(|| KindSummary {
                    kind,
                    count: ages.len(),
                    average_age: mean(&ages),
                })
            })
            .collect();

        let mut by_age: Vec<&&Animal> = animals.iter().collect();
        by_age.sort_by(|a, b| b.age().cmp(&a.age()).then(a.id().cmp(&b.id())));
        let oldest = by_age
            .into_iter()
            .take(3)
            .map(|a| (a.name().to_string(), a.age()))
            .collect();

        let per_enclosure = zoo
            .enclosures()
            .iter()
            .filter(|e| !e.is_empty())
            .map(|e| (e.name().to_string(), e.len()))
            .collect();

        let ages: Vec<f64> = animals.iter().map(|a| f64::from(a.age())).collect();

        Self {
            by_kind,
            oldest,
            per_enclosure,
            total: animals.len(),
            average_age: mean(&ages),
            erratic_capable: animals.iter().filter(|a| a.can_act_erratically()).count(),
            can_fly: animals.iter().filter(|a| a.can_fly()).count(),
        }
    }

    /// Report lines for narration.
    pub fn lines(&self) -> Vec<String> {
        let mut out = vec!["📊 Statistics by kind:".to_string()];
        out.extend(self.by_kind.iter().map(|s| {
            format!(
                "  {}: {} animals, average age {:.1} years",
                s.kind, s.count, s.average_age
            )
        }));

        out.push("🏆 Oldest animals:".to_string());
        out.extend(
            self.oldest
                .iter()
                .map(|(name, age)| format!("  {name}: {age} years")),
        );

        out.push("🏠 Animals in enclosures:".to_string());
        out.extend(
            self.per_enclosure
                .iter()
                .map(|(name, count)| format!("  {name}: {count} animals")),
        );

        out.push("📈 General statistics:".to_string());
        out.push(format!("  Total animals: {}", self.total));
        out.push(format!("  Average age: {:.1} years", self.average_age));
        out.push(format!("  Can act crazy: {}", self.erratic_capable));
        out.push(format!("  Can fly: {}", self.can_fly));
        out
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
