use crate::errors::AppError;
use crate::services::srcei::catalog::{self, Procedure, Region};

/// A validated (procedure, region) pair. Only constructible through the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotQuery {
    procedure: &'static Procedure,
    region: &'static Region,
}

impl SlotQuery {
    pub fn new(procedure_id: i64, region_id: i64) -> Result<Self, AppError> {
        let procedure = catalog::procedure(procedure_id).ok_or_else(|| {
            AppError::Validation(format!(
                "procedure_id must be one of {}",
                catalog::procedure_ids_display()
            ))
        })?;
        let region = catalog::region(region_id).ok_or_else(|| {
            AppError::Validation(format!(
                "region_id must be between {} and {}",
                catalog::REGION_ID_MIN,
                catalog::REGION_ID_MAX
            ))
        })?;
        Ok(Self { procedure, region })
    }

    /// Parse raw query-string values. Missing or non-integer values are rejected.
    pub fn parse(procedure_id: Option<&str>, region_id: Option<&str>) -> Result<Self, AppError> {
        let procedure_id = parse_param("procedure_id", procedure_id)?;
        let region_id = parse_param("region_id", region_id)?;
        Self::new(procedure_id, region_id)
    }

    pub fn procedure(&self) -> &'static Procedure {
        self.procedure
    }

    pub fn region(&self) -> &'static Region {
        self.region
    }

    pub fn procedure_id(&self) -> u8 {
        self.procedure.id
    }

    pub fn region_id(&self) -> u8 {
        self.region.id
    }
}

fn parse_param(name: &str, value: Option<&str>) -> Result<i64, AppError> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{name} is required")))?;
    value
        .parse::<i64>()
        .map_err(|_| AppError::Validation(format!("{name} must be an integer, got {value:?}")))
}
