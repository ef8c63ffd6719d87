use crate::provider::{DataProvider, ProviderError};

/// Sample judges (name, password) loaded by `admin seed`
pub const SAMPLE_JUDGES: [(&str, &str); 2] = [("Dr. Smith", "1234"), ("Prof. Johnson", "1234")];

pub const SAMPLE_PROJECTS: [&str; 3] = [
    "Quantum Levitation in Frogs",
    "AI for Recycling",
    "Mars Habitat Design",
];

pub const SAMPLE_CRITERIA: [&str; 3] = ["Scientific Method", "Creativity", "Presentation"];

/// Which catalog table a record lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RecordKind {
    Judge,
    Project,
    Criterion,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub added: usize,
    /// Records that already existed by name
    pub skipped: usize,
}

impl SeedSummary {
    fn record(&mut self, result: Result<(), ProviderError>) -> Result<(), ProviderError> {
        match result {
            Ok(()) => {
                self.added += 1;
                Ok(())
            }
            Err(ProviderError::Duplicate { kind, name }) => {
                tracing::debug!("seed: {} '{}' already exists", kind, name);
                self.skipped += 1;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Load the sample judges, projects and criteria.
///
/// Records that already exist are skipped, so seeding twice is harmless.
pub async fn seed_sample_data<P: DataProvider>(provider: &P) -> Result<SeedSummary, ProviderError> {
    let mut summary = SeedSummary::default();

    for (name, password) in SAMPLE_JUDGES {
        summary.record(provider.add_judge(name, password).await)?;
    }
    for name in SAMPLE_PROJECTS {
        summary.record(provider.add_project(name).await)?;
    }
    for name in SAMPLE_CRITERIA {
        summary.record(provider.add_criterion(name).await)?;
    }

    tracing::debug!(added = summary.added, skipped = summary.skipped, "seeded sample data");
    Ok(summary)
}

pub async fn add_record<P: DataProvider>(
    provider: &P,
    kind: RecordKind,
    name: &str,
    password: Option<&str>,
) -> Result<(), ProviderError> {
    match kind {
        RecordKind::Judge => {
            let password = password
                .ok_or_else(|| ProviderError::Invalid("a judge needs a password".to_string()))?;
            provider.add_judge(name, password).await
        }
        RecordKind::Project => provider.add_project(name).await,
        RecordKind::Criterion => provider.add_criterion(name).await,
    }
}

/// Delete a record along with the ratings and comments that point at it
pub async fn remove_record<P: DataProvider>(
    provider: &P,
    kind: RecordKind,
    id: &str,
) -> Result<(), ProviderError> {
    match kind {
        RecordKind::Judge => provider.delete_judge(id).await,
        RecordKind::Project => provider.delete_project(id).await,
        RecordKind::Criterion => provider.delete_criterion(id).await,
    }
}
