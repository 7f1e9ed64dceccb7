//! Procedure and region tables as the booking site labels them.

#[derive(Debug, PartialEq, Eq)]
pub struct Procedure {
    pub id: u8,
    /// Button caption on the procedure selection page.
    pub label: &'static str,
    /// Distinctive word used when the caption has been reworded.
    pub keyword: &'static str,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Region {
    pub id: u8,
    pub name: &'static str,
}

impl Region {
    /// `value` attribute of the region `<option>`.
    pub fn option_value(&self) -> String {
        self.id.to_string()
    }
}

pub const REGION_ID_MIN: u8 = 1;
pub const REGION_ID_MAX: u8 = 16;

static PROCEDURES: [Procedure; 8] = [
    Procedure { id: 6, label: "Renovación Chileno/a", keyword: "Chileno" },
    Procedure { id: 9, label: "Reimpresión cédula", keyword: "Reimpresión" },
    Procedure { id: 10, label: "Renovación Extranjero/a", keyword: "Extranjero" },
    Procedure { id: 11, label: "Solicitud de Pasaporte", keyword: "Pasaporte" },
    Procedure { id: 12, label: "Menores de Edad", keyword: "Menores" },
    Procedure { id: 13, label: "Apostilla", keyword: "Apostilla" },
    Procedure { id: 14, label: "Rectificaciones", keyword: "Rectificaciones" },
    Procedure { id: 15, label: "Vehículos", keyword: "Vehículos" },
];

static REGIONS: [Region; 16] = [
    Region { id: 1, name: "REGION DE TARAPACA" },
    Region { id: 2, name: "REGION DE ANTOFAGASTA" },
    Region { id: 3, name: "REGION DE ATACAMA" },
    Region { id: 4, name: "REGION DE COQUIMBO" },
    Region { id: 5, name: "REGION DE VALPARAISO" },
    Region { id: 6, name: "REGION DEL LIBERTADOR GENERAL BERNARDO O'HIGGINS" },
    Region { id: 7, name: "REGION DEL MAULE" },
    Region { id: 8, name: "REGION DEL BIO BIO" },
    Region { id: 9, name: "REGION DE LA ARAUCANIA" },
    Region { id: 10, name: "REGION DE LOS LAGOS" },
    Region { id: 11, name: "REGION DE AYSEN DEL GENERAL CARLOS IBAÑEZ DEL CAMPO" },
    Region { id: 12, name: "REGION DE MAGALLANES Y DE LA ANTARTICA CHILENA" },
    Region { id: 13, name: "REGION METROPOLITANA DE SANTIAGO" },
    Region { id: 14, name: "REGION DE LOS RIOS" },
    Region { id: 15, name: "REGION DE ARICA Y PARINACOTA" },
    Region { id: 16, name: "REGION DE ÑUBLE" },
];

pub fn procedure(id: i64) -> Option<&'static Procedure> {
    PROCEDURES.iter().find(|p| i64::from(p.id) == id)
}

pub fn region(id: i64) -> Option<&'static Region> {
    REGIONS.iter().find(|r| i64::from(r.id) == id)
}

pub fn procedure_ids_display() -> String {
    PROCEDURES
        .iter()
        .map(|p| p.id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
