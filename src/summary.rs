use serde::{Deserialize, Serialize};

/// Top-level document keys the importer recognizes, in processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    EquiposAgrupados,
    EquiposIndividuales,
    InventarioGeneral,
    EquiposAsignados,
    EquiposBaja,
    TandasNuevas,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::EquiposAgrupados,
        Section::EquiposIndividuales,
        Section::InventarioGeneral,
        Section::EquiposAsignados,
        Section::EquiposBaja,
        Section::TandasNuevas,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Section::EquiposAgrupados => "equipos_agrupados",
            Section::EquiposIndividuales => "equipos_individuales",
            Section::InventarioGeneral => "inventario_general",
            Section::EquiposAsignados => "equipos_asignados",
            Section::EquiposBaja => "equipos_baja",
            Section::TandasNuevas => "tandas_nuevas",
        }
    }

    pub fn from_key(key: &str) -> Option<Section> {
        Section::ALL.into_iter().find(|s| s.key() == key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Written,
    Skipped(String),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRecord {
    pub section: Section,
    pub index: usize,
    pub record: String,
    pub reason: String,
}

/// What one routine did with one section's record list.
#[derive(Debug, Clone)]
pub struct SectionReport {
    pub section: Section,
    pub written: usize,
    pub skipped: Vec<SkippedRecord>,
}

impl SectionReport {
    pub fn new(section: Section) -> Self {
        Self {
            section,
            written: 0,
            skipped: Vec::new(),
        }
    }

    pub fn push(&mut self, index: usize, record: String, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Written => self.written += 1,
            RecordOutcome::Skipped(reason) => self.skipped.push(SkippedRecord {
                section: self.section,
                index,
                record,
                reason,
            }),
        }
    }
}

/// Per-section success counters for one run. Serializes with the same six
/// keys as the input document.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub equipos_agrupados: usize,
    pub equipos_individuales: usize,
    pub inventario_general: usize,
    pub equipos_asignados: usize,
    pub equipos_baja: usize,
    pub tandas_nuevas: usize,
}

impl ImportSummary {
    pub fn get(&self, section: Section) -> usize {
        match section {
            Section::EquiposAgrupados => self.equipos_agrupados,
            Section::EquiposIndividuales => self.equipos_individuales,
            Section::InventarioGeneral => self.inventario_general,
            Section::EquiposAsignados => self.equipos_asignados,
            Section::EquiposBaja => self.equipos_baja,
            Section::TandasNuevas => self.tandas_nuevas,
        }
    }

    fn counter_mut(&mut self, section: Section) -> &mut usize {
        match section {
            Section::EquiposAgrupados => &mut self.equipos_agrupados,
            Section::EquiposIndividuales => &mut self.equipos_individuales,
            Section::InventarioGeneral => &mut self.inventario_general,
            Section::EquiposAsignados => &mut self.equipos_asignados,
            Section::EquiposBaja => &mut self.equipos_baja,
            Section::TandasNuevas => &mut self.tandas_nuevas,
        }
    }

    pub fn absorb(&mut self, report: &SectionReport) {
        *self.counter_mut(report.section) += report.written;
    }

    /// `inventario_general` is never counted on its own: it mirrors the
    /// grouped + individual totals at the moment the section finishes.
    pub fn close_general(&mut self) {
        self.inventario_general = self.equipos_agrupados + self.equipos_individuales;
    }

    pub fn total(&self) -> usize {
        Section::ALL
            .into_iter()
            .filter(|s| *s != Section::InventarioGeneral)
            .map(|s| self.get(s))
            .sum()
    }
}
