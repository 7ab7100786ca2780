use msa_core::db::StructuredSource;
use msa_core::domain::{sqlite_citation, Evidence, SqlEvidence, SqlOutcome};

/// Hard cap on rows read from any one relation.
pub const ROW_CAP: usize = 10;

/// Read up to [`ROW_CAP`] rows from every relation of every container.
///
/// A failing container or relation becomes an error-tagged entry; collection of
/// the others continues. Returns the evidence and one citation per container touched.
pub fn collect_sql(source: &dyn StructuredSource) -> (Vec<Evidence>, Vec<String>) {
    let mut evidences = Vec::new();
    let mut citations: Vec<String> = Vec::new();

    let containers = match source.list_containers() {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "could not enumerate SQL containers");
            return (evidences, citations);
        }
    };
    if containers.is_empty() {
        tracing::warn!("no SQL containers available");
    }

    for container in containers.iter() {
        let citation = sqlite_citation(container);
        if !citations.contains(&citation) {
            citations.push(citation);
        }

        let relations = match source.list_relations(container) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(container = %container, error = %e, "could not enumerate relations");
                evidences.push(Evidence::Sql(SqlEvidence {
                    container: container.clone(),
                    relation: None,
                    outcome: SqlOutcome::Error(e.to_string()),
                }));
                continue;
            }
        };

        for relation in relations {
            let outcome = match source.read_rows(container, &relation, ROW_CAP) {
                Ok(mut rows) => {
                    rows.truncate(ROW_CAP);
                    tracing::debug!(container = %container, relation = %relation, rows = rows.len(), "relation read");
                    SqlOutcome::Rows(rows)
                }
                Err(e) => {
                    tracing::warn!(container = %container, relation = %relation, error = %e, "relation read failed");
                    SqlOutcome::Error(e.to_string())
                }
            };
            evidences.push(Evidence::Sql(SqlEvidence {
                container: container.clone(),
                relation: Some(relation),
                outcome,
            }));
        }
    }

    tracing::info!(entries = evidences.len(), containers = citations.len(), "SQL evidence collected");
    (evidences, citations)
}
