use crate::generate::{GenerationReport, generate_corpus};
use crate::{CaseId, Category, HarnessConfig, HarnessError};
use tc_core::{CaseArgs, Solution, Value};

/// Ordered argument tuples, split into samples and other cases.
///
/// Each tuple's index within its category is its insertion position, so
/// registering the same tuples in the same order always yields the same
/// case ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseRegistry {
    samples: Vec<Vec<Value>>,
    others: Vec<Vec<Value>>,
}

impl CaseRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sample(&mut self, args: impl CaseArgs) -> CaseId {
        self.push(Category::Sample, args.into_args())
    }

    pub fn add(&mut self, args: impl CaseArgs) -> CaseId {
        self.push(Category::Other, args.into_args())
    }

    fn push(&mut self, category: Category, args: Vec<Value>) -> CaseId {
        let bucket = match category {
            Category::Sample => &mut self.samples,
            Category::Other => &mut self.others,
        };
        bucket.push(args);
        CaseId::new(category, bucket.len() - 1)
    }

    #[must_use]
    pub fn samples(&self) -> &[Vec<Value>] {
        &self.samples
    }

    #[must_use]
    pub fn others(&self) -> &[Vec<Value>] {
        &self.others
    }

    #[must_use]
    pub fn category_len(&self, category: Category) -> usize {
        match category {
            Category::Sample => self.samples.len(),
            Category::Other => self.others.len(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len() + self.others.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() && self.others.is_empty()
    }

    /// Samples in insertion order, then other cases in insertion order.
    pub fn cases(&self) -> impl Iterator<Item = (CaseId, &[Value])> {
        let samples = self.samples.iter().enumerate().map(|(index, args)| {
            (CaseId::new(Category::Sample, index), args.as_slice())
        });
        let others = self.others.iter().enumerate().map(|(index, args)| {
            (CaseId::new(Category::Other, index), args.as_slice())
        });
        samples.chain(others)
    }

    pub fn generate(
        &self,
        config: &HarnessConfig,
        reference: &Solution,
    ) -> Result<GenerationReport, HarnessError> {
        generate_corpus(config, self, reference)
    }
}
