use crate::config::ImportConfig;
use crate::error::{ImportError, Result};
use crate::record::{self, Record, RecordError};
use crate::summary::{ImportSummary, RecordOutcome, Section, SectionReport, SkippedRecord};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

pub const ESTADO_DISPONIBLE: &str = "disponible";
pub const ESTADO_ASIGNADO: &str = "asignado";
pub const ESTADO_BAJA: &str = "baja";
pub const ESTADO_TANDA_EN_PROCESO: &str = "en_proceso";
const DISPONIBLE_SI: &str = "Si";

const GROUPED_KEY: &str = "codigo_barras_unificado";
const GROUPED_COLUMNS: [&str; 12] = [
    GROUPED_KEY,
    "nit",
    "sede_id",
    "asignado_anterior",
    "asignado_actual",
    "descripcion_general",
    "estado_general",
    "creador_registro",
    "fecha_creacion",
    "trazabilidad_soporte",
    "documentos_entrega",
    "observaciones",
];
const GROUPED_MUTABLE: [&str; 5] = [
    "asignado_actual",
    "estado_general",
    "trazabilidad_soporte",
    "documentos_entrega",
    "observaciones",
];

const INDIVIDUAL_KEY: &str = "codigo_barras_individual";
const INDIVIDUAL_COLUMNS: [&str; 32] = [
    INDIVIDUAL_KEY,
    "entrada_oc_compra",
    "cargado_nit",
    "ciudad",
    "tecnologia",
    "serial",
    "modelo",
    "anterior_asignado",
    "placa",
    "marca",
    "procesador",
    "arch_ram",
    "cantidad_ram",
    "tipo_disco",
    "espacio_disco",
    "so",
    "estado",
    "asignado_nuevo",
    "fecha",
    "fecha_llegada",
    "area",
    "marca_monitor",
    "modelo_monitor",
    "serial_monitor",
    "placa_monitor",
    "proveedor",
    "oc",
    "observaciones",
    "disponible",
    "sede_id",
    "creador_registro",
    "fecha_creacion",
];
const INDIVIDUAL_MUTABLE: [&str; 3] = ["asignado_nuevo", "estado", "observaciones"];

const BATCH_KEY: &str = "numero_tanda";
const BATCH_MUTABLE: [&str; 5] = [
    "descripcion",
    "cantidad_equipos",
    "proveedor",
    "valor_total",
    "observaciones",
];

/// Everything a finished run hands back: the counters, plus the records that
/// were skipped and why.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportOutcome {
    pub summary: ImportSummary,
    pub skipped: Vec<SkippedRecord>,
}

impl ImportOutcome {
    fn absorb(&mut self, report: SectionReport) {
        self.summary.absorb(&report);
        self.skipped.extend(report.skipped);
    }
}

pub fn now_stamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn upsert_sql(table: &str, columns: &[&str], key: &str, mutable: &[&str]) -> String {
    let placeholders = vec!["?"; columns.len()].join(", ");
    let updates = mutable
        .iter()
        .map(|c| format!("{c} = excluded.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {table}({}) VALUES({placeholders})
         ON CONFLICT({key}) DO UPDATE SET {updates}",
        columns.join(", ")
    )
}

/// Loads and parses the import document. Nothing touches the store until
/// this has succeeded.
pub fn read_document(path: &Path) -> Result<Value> {
    if !path.is_file() {
        return Err(ImportError::FileNotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path).map_err(|source| ImportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|e| ImportError::MalformedInput(e.to_string()))
}

/// Writes one JSON inventory document into the store over a single
/// connection, one record at a time.
pub struct Importer<'a> {
    conn: &'a Connection,
    config: &'a ImportConfig,
}

impl<'a> Importer<'a> {
    pub fn new(conn: &'a Connection, config: &'a ImportConfig) -> Self {
        Self { conn, config }
    }

    pub fn import_file(&self, path: &Path) -> Result<ImportOutcome> {
        let doc = read_document(path)?;
        self.import_parsed(path, &doc)
    }

    /// Imports a document already loaded with [`read_document`].
    pub fn import_parsed(&self, path: &Path, doc: &Value) -> Result<ImportOutcome> {
        info!(path = %path.display(), "starting auto import");
        let outcome = self.import_document(doc)?;
        info!(
            path = %path.display(),
            summary = %serde_json::to_string(&outcome.summary).unwrap_or_default(),
            written = outcome.summary.total(),
            skipped = outcome.skipped.len(),
            "auto import completed"
        );
        Ok(outcome)
    }

    /// Sections run in a fixed order whatever their order in the document:
    /// assignments and decommissions refer to equipment rows written earlier.
    pub fn import_document(&self, doc: &Value) -> Result<ImportOutcome> {
        let Some(obj) = doc.as_object() else {
            return Err(ImportError::MalformedInput(
                "top-level value must be an object".into(),
            ));
        };

        for key in obj.keys() {
            if Section::from_key(key).is_none() {
                debug!(key = %key, "ignoring unrecognized section");
            }
        }

        let mut outcome = ImportOutcome::default();
        for section in Section::ALL {
            let Some(value) = obj.get(section.key()).filter(|v| !v.is_null()) else {
                continue;
            };

            if section == Section::InventarioGeneral {
                self.import_general(value, &mut outcome);
                continue;
            }

            let Some(records) = value.as_array() else {
                warn!(section = section.key(), "section is not a list; skipping");
                continue;
            };
            outcome.absorb(self.run_section(section, records)?);
        }
        Ok(outcome)
    }

    /// Runs a single section on its own, as the CSV import does.
    pub fn import_section(
        &self,
        source: &Path,
        section: Section,
        records: &[Value],
    ) -> Result<ImportOutcome> {
        info!(
            path = %source.display(),
            section = section.key(),
            records = records.len(),
            "starting section import"
        );
        let mut outcome = ImportOutcome::default();
        outcome.absorb(self.run_section(section, records)?);
        info!(
            path = %source.display(),
            section = section.key(),
            written = outcome.summary.get(section),
            skipped = outcome.skipped.len(),
            "section import completed"
        );
        Ok(outcome)
    }

    fn import_general(&self, value: &Value, outcome: &mut ImportOutcome) {
        match value.as_object() {
            Some(general) => {
                let routines: [(&str, fn(&Self, &[Value]) -> SectionReport); 2] = [
                    ("agrupados", Self::upsert_agrupados),
                    ("individuales", Self::upsert_individuales),
                ];
                for (sub, routine) in routines {
                    match general.get(sub).filter(|v| !v.is_null()) {
                        Some(Value::Array(records)) => outcome.absorb(routine(self, records)),
                        Some(_) => warn!(
                            section = Section::InventarioGeneral.key(),
                            sub, "sub-section is not a list; skipping"
                        ),
                        None => {}
                    }
                }
            }
            None => warn!(
                section = Section::InventarioGeneral.key(),
                "section is not an object; skipping"
            ),
        }
        outcome.summary.close_general();
    }

    /// `inventario_general` has no routine of its own; it only nests the two
    /// equipment sections and goes through `import_general`.
    fn run_section(&self, section: Section, records: &[Value]) -> Result<SectionReport> {
        Ok(match section {
            Section::EquiposAgrupados => self.upsert_agrupados(records),
            Section::EquiposIndividuales => self.upsert_individuales(records),
            Section::EquiposAsignados => self.apply_asignaciones(records),
            Section::EquiposBaja => self.record_bajas(records),
            Section::TandasNuevas => self.upsert_tandas(records),
            Section::InventarioGeneral => {
                return Err(ImportError::UnknownSection(section.key().to_string()))
            }
        })
    }

    /// Runs `write` for every record inside its own transaction. A failing
    /// record is rolled back and reported; the loop always continues.
    fn each_record<F>(
        &self,
        section: Section,
        records: &[Value],
        describe_keys: &[&str],
        mut write: F,
    ) -> SectionReport
    where
        F: FnMut(&Connection, &Record) -> std::result::Result<(), RecordError>,
    {
        let mut report = SectionReport::new(section);
        for (index, value) in records.iter().enumerate() {
            let label = record::describe(value, describe_keys);
            let res = record::as_record(value).and_then(|rec| {
                let tx = self.conn.unchecked_transaction()?;
                write(&*tx, rec)?;
                tx.commit()?;
                Ok(())
            });
            let outcome = match res {
                Ok(()) => RecordOutcome::Written,
                Err(e) => {
                    warn!(
                        section = section.key(),
                        index,
                        record = %label,
                        error = %e,
                        "skipping record"
                    );
                    RecordOutcome::Skipped(e.to_string())
                }
            };
            report.push(index, label, outcome);
        }
        report
    }

    pub fn upsert_agrupados(&self, records: &[Value]) -> SectionReport {
        let sql = upsert_sql(
            "equipos_agrupados",
            &GROUPED_COLUMNS,
            GROUPED_KEY,
            &GROUPED_MUTABLE,
        );
        let cfg = self.config;
        self.each_record(Section::EquiposAgrupados, records, &[GROUPED_KEY], |conn, rec| {
            let key = record::key_text(rec, GROUPED_KEY)?;
            let now = now_stamp();
            let values = GROUPED_COLUMNS
                .iter()
                .map(|&col| match col {
                    GROUPED_KEY => Ok(SqlValue::Text(key.clone())),
                    "nit" => record::sql_or(rec, col, &cfg.default_tax_id),
                    "estado_general" => record::sql_or(rec, col, ESTADO_DISPONIBLE),
                    "creador_registro" => record::sql_or(rec, col, &cfg.default_creator_tag),
                    "fecha_creacion" => record::sql_or(rec, col, &now),
                    _ => record::sql(rec, col),
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            conn.prepare_cached(&sql)?.execute(params_from_iter(values))?;
            Ok(())
        })
    }

    pub fn upsert_individuales(&self, records: &[Value]) -> SectionReport {
        let sql = upsert_sql(
            "equipos_individuales",
            &INDIVIDUAL_COLUMNS,
            INDIVIDUAL_KEY,
            &INDIVIDUAL_MUTABLE,
        );
        let cfg = self.config;
        self.each_record(
            Section::EquiposIndividuales,
            records,
            &[INDIVIDUAL_KEY, "serial"],
            |conn, rec| {
                let key = record::key_text(rec, INDIVIDUAL_KEY)?;
                let now = now_stamp();
                let values = INDIVIDUAL_COLUMNS
                    .iter()
                    .map(|&col| match col {
                        INDIVIDUAL_KEY => Ok(SqlValue::Text(key.clone())),
                        "estado" => record::sql_or(rec, col, ESTADO_DISPONIBLE),
                        "disponible" => record::sql_or(rec, col, DISPONIBLE_SI),
                        "creador_registro" => record::sql_or(rec, col, &cfg.default_creator_tag),
                        "fecha_creacion" => record::sql_or(rec, col, &now),
                        _ => record::sql(rec, col),
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                conn.prepare_cached(&sql)?.execute(params_from_iter(values))?;
                Ok(())
            },
        )
    }

    /// Writes the assignee into both equipment tables using the same code.
    /// The code is not matched to a table first, so the table that does not
    /// hold it just updates zero rows. The record still counts as written.
    pub fn apply_asignaciones(&self, records: &[Value]) -> SectionReport {
        self.each_record(Section::EquiposAsignados, records, &["codigo"], |conn, rec| {
            let codigo = match record::key_text(rec, "codigo") {
                Ok(c) => SqlValue::Text(c),
                Err(RecordError::MissingKey(_)) => SqlValue::Null,
                Err(e) => return Err(e),
            };
            let asignado = record::sql(rec, "asignado_a")?;

            let individual = conn.execute(
                "UPDATE equipos_individuales
                 SET asignado_nuevo = ?, estado = ?
                 WHERE codigo_barras_individual = ?",
                (&asignado, ESTADO_ASIGNADO, &codigo),
            )?;
            let grouped = conn.execute(
                "UPDATE equipos_agrupados
                 SET asignado_actual = ?, estado_general = ?
                 WHERE codigo_barras_unificado = ?",
                (&asignado, ESTADO_ASIGNADO, &codigo),
            )?;
            if individual == 0 && grouped == 0 {
                warn!(codigo = ?codigo, "assignment matched no equipment");
            } else {
                debug!(individual, grouped, "assignment applied");
            }
            Ok(())
        })
    }

    /// Appends a decommission row stamped with the current server time, then
    /// marks the individual equipment with that numeric id as `baja`. Grouped
    /// equipment is never touched here, whatever `tipo_inventario` says.
    pub fn record_bajas(&self, records: &[Value]) -> SectionReport {
        self.each_record(Section::EquiposBaja, records, &["equipo_id"], |conn, rec| {
            let equipo_id = record::sql(rec, "equipo_id")?;
            let values = [
                equipo_id.clone(),
                record::sql(rec, "tipo_inventario")?,
                record::sql(rec, "motivo_baja")?,
                SqlValue::Text(now_stamp()),
                record::sql(rec, "responsable_baja")?,
                record::sql(rec, "documentos_soporte")?,
                record::sql(rec, "fotografias_soporte")?,
                record::sql(rec, "observaciones")?,
            ];
            conn.prepare_cached(
                "INSERT INTO inventario_bajas(equipo_id, tipo_inventario, motivo_baja, fecha_baja,
                    responsable_baja, documentos_soporte, fotografias_soporte, observaciones)
                 VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
            )?
            .execute(params_from_iter(values))?;
            conn.execute(
                "UPDATE equipos_individuales SET estado = ? WHERE id = ?",
                (ESTADO_BAJA, &equipo_id),
            )?;
            Ok(())
        })
    }

    /// New batches always land as `en_proceso` with an arrival stamp of now;
    /// re-importing a batch number only refreshes its descriptive fields.
    pub fn upsert_tandas(&self, records: &[Value]) -> SectionReport {
        let columns = [
            BATCH_KEY,
            "descripcion",
            "fecha_ingreso",
            "cantidad_equipos",
            "proveedor",
            "valor_total",
            "estado",
            "observaciones",
        ];
        let sql = upsert_sql("tandas_equipos_nuevos", &columns, BATCH_KEY, &BATCH_MUTABLE);
        self.each_record(Section::TandasNuevas, records, &[BATCH_KEY], |conn, rec| {
            let values = [
                SqlValue::Text(record::key_text(rec, BATCH_KEY)?),
                record::sql(rec, "descripcion")?,
                SqlValue::Text(now_stamp()),
                record::sql(rec, "cantidad_equipos")?,
                record::sql(rec, "proveedor")?,
                record::sql(rec, "valor_total")?,
                SqlValue::Text(ESTADO_TANDA_EN_PROCESO.to_string()),
                record::sql(rec, "observaciones")?,
            ];
            conn.prepare_cached(&sql)?.execute(params_from_iter(values))?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use rusqlite::OptionalExtension;
    use serde_json::json;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().expect("open");
        db::init_schema(&conn).expect("schema");
        conn
    }

    fn grouped_row(conn: &Connection, code: &str) -> Option<(String, Option<String>, String, String)> {
        conn.query_row(
            "SELECT estado_general, asignado_actual, creador_registro, fecha_creacion
             FROM equipos_agrupados WHERE codigo_barras_unificado = ?",
            [code],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .optional()
        .expect("query grouped")
    }

    fn individual_state(conn: &Connection, code: &str) -> (String, Option<String>) {
        conn.query_row(
            "SELECT estado, asignado_nuevo FROM equipos_individuales WHERE codigo_barras_individual = ?",
            [code],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .expect("query individual")
    }

    #[test]
    fn grouped_defaults_fill_missing_fields() {
        let conn = setup();
        let cfg = ImportConfig::default();
        let report = Importer::new(&conn, &cfg)
            .upsert_agrupados(&[json!({ "codigo_barras_unificado": "G-1", "estado_general": null })]);
        assert_eq!(report.written, 1);

        let (estado, _, creador, fecha) = grouped_row(&conn, "G-1").expect("row");
        assert_eq!(estado, "disponible");
        assert_eq!(creador, "AUTO_IMPORT");
        assert_eq!(fecha.len(), "2024-01-01 00:00:00".len());
        let nit: String = conn
            .query_row("SELECT nit FROM equipos_agrupados", [], |r| r.get(0))
            .expect("nit");
        assert_eq!(nit, "901.234.567-8");
    }

    #[test]
    fn injected_config_replaces_default_constants() {
        let conn = setup();
        let cfg = ImportConfig {
            default_tax_id: "800.000.000-1".into(),
            default_creator_tag: "NIGHTLY".into(),
            ..ImportConfig::default()
        };
        let importer = Importer::new(&conn, &cfg);
        importer.upsert_agrupados(&[json!({ "codigo_barras_unificado": "G-1" })]);
        importer.upsert_individuales(&[json!({ "codigo_barras_individual": "I-1" })]);

        let (nit, creador): (String, String) = conn
            .query_row("SELECT nit, creador_registro FROM equipos_agrupados", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .expect("grouped");
        assert_eq!(nit, "800.000.000-1");
        assert_eq!(creador, "NIGHTLY");
        let creador: String = conn
            .query_row("SELECT creador_registro FROM equipos_individuales", [], |r| r.get(0))
            .expect("individual");
        assert_eq!(creador, "NIGHTLY");
    }

    #[test]
    fn grouped_reimport_updates_mutable_fields_only() {
        let conn = setup();
        let cfg = ImportConfig::default();
        let importer = Importer::new(&conn, &cfg);
        importer.upsert_agrupados(&[json!({
            "codigo_barras_unificado": "G-1",
            "creador_registro": "ana",
            "fecha_creacion": "2023-05-01 08:00:00",
            "descripcion_general": "kit oficina",
            "asignado_actual": "Luis"
        })]);
        let report = importer.upsert_agrupados(&[json!({
            "codigo_barras_unificado": "G-1",
            "creador_registro": "pedro",
            "fecha_creacion": "2025-01-01 00:00:00",
            "descripcion_general": "otra",
            "asignado_actual": "Marta",
            "estado_general": "mantenimiento"
        })]);
        assert_eq!(report.written, 1);

        let (estado, asignado, creador, fecha) = grouped_row(&conn, "G-1").expect("row");
        assert_eq!(estado, "mantenimiento");
        assert_eq!(asignado.as_deref(), Some("Marta"));
        assert_eq!(creador, "ana");
        assert_eq!(fecha, "2023-05-01 08:00:00");
        let desc: String = conn
            .query_row("SELECT descripcion_general FROM equipos_agrupados", [], |r| r.get(0))
            .expect("desc");
        assert_eq!(desc, "kit oficina");
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM equipos_agrupados", [], |r| r.get(0))
            .expect("count");
        assert_eq!(n, 1);
    }

    #[test]
    fn individual_reimport_is_idempotent() {
        let conn = setup();
        let cfg = ImportConfig::default();
        let importer = Importer::new(&conn, &cfg);
        let batch = [json!({
            "codigo_barras_individual": "I-1",
            "serial": "SN1",
            "asignado_nuevo": "Carla",
            "observaciones": "ok"
        })];
        importer.upsert_individuales(&batch);
        let first: (String, Option<String>, String, String) = conn
            .query_row(
                "SELECT estado, asignado_nuevo, creador_registro, fecha_creacion FROM equipos_individuales",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .expect("first");
        importer.upsert_individuales(&batch);
        let second: (String, Option<String>, String, String) = conn
            .query_row(
                "SELECT estado, asignado_nuevo, creador_registro, fecha_creacion FROM equipos_individuales",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .expect("second");
        assert_eq!(first, second);
        let disponible: String = conn
            .query_row("SELECT disponible FROM equipos_individuales", [], |r| r.get(0))
            .expect("disponible");
        assert_eq!(disponible, "Si");
    }

    #[test]
    fn failing_records_are_skipped_without_stopping_the_batch() {
        let conn = setup();
        let cfg = ImportConfig::default();
        let report = Importer::new(&conn, &cfg).upsert_individuales(&[
            json!({ "codigo_barras_individual": "I-1" }),
            json!("not an object"),
            json!({ "serial": "no barcode" }),
            json!({ "codigo_barras_individual": "I-2", "observaciones": { "nested": true } }),
            json!({ "codigo_barras_individual": "I-3" }),
        ]);
        assert_eq!(report.written, 2);
        let indexes: Vec<_> = report.skipped.iter().map(|s| s.index).collect();
        assert_eq!(indexes, vec![1, 2, 3]);
        assert!(report.skipped[1].reason.contains("codigo_barras_individual"));
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM equipos_individuales", [], |r| r.get(0))
            .expect("count");
        assert_eq!(n, 2);
    }

    #[test]
    fn assignment_only_touches_the_table_holding_the_code() {
        let conn = setup();
        let cfg = ImportConfig::default();
        let importer = Importer::new(&conn, &cfg);
        importer.upsert_individuales(&[json!({ "codigo_barras_individual": "C-1" })]);
        importer.upsert_agrupados(&[json!({ "codigo_barras_unificado": "G-9", "asignado_actual": "Rosa" })]);

        let report = importer.apply_asignaciones(&[json!({ "codigo": "C-1", "asignado_a": "Jorge" })]);
        assert_eq!(report.written, 1);
        assert_eq!(
            individual_state(&conn, "C-1"),
            ("asignado".to_string(), Some("Jorge".to_string()))
        );
        let (estado, asignado, _, _) = grouped_row(&conn, "G-9").expect("grouped");
        assert_eq!(estado, "disponible");
        assert_eq!(asignado.as_deref(), Some("Rosa"));
    }

    #[test]
    fn assignment_with_unknown_code_still_counts() {
        let conn = setup();
        let cfg = ImportConfig::default();
        let report = Importer::new(&conn, &cfg)
            .apply_asignaciones(&[json!({ "codigo": "NOPE", "asignado_a": "x" }), json!({})]);
        assert_eq!(report.written, 2);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn decommission_logs_server_time_and_marks_individual() {
        let conn = setup();
        let cfg = ImportConfig::default();
        let importer = Importer::new(&conn, &cfg);
        importer.upsert_individuales(&[json!({ "codigo_barras_individual": "I-1" })]);
        importer.upsert_agrupados(&[json!({ "codigo_barras_unificado": "G-1" })]);
        let id: i64 = conn
            .query_row("SELECT id FROM equipos_individuales", [], |r| r.get(0))
            .expect("id");

        let report = importer.record_bajas(&[json!({
            "equipo_id": id,
            "tipo_inventario": "individual",
            "motivo_baja": "fin de vida",
            "fecha_baja": "1999-01-01 00:00:00"
        })]);
        assert_eq!(report.written, 1);

        let (equipo_id, motivo, fecha): (i64, String, String) = conn
            .query_row(
                "SELECT equipo_id, motivo_baja, fecha_baja FROM inventario_bajas",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .expect("baja row");
        assert_eq!(equipo_id, id);
        assert_eq!(motivo, "fin de vida");
        assert_ne!(fecha, "1999-01-01 00:00:00");
        assert_eq!(individual_state(&conn, "I-1").0, "baja");
        assert_eq!(grouped_row(&conn, "G-1").expect("grouped").0, "disponible");
    }

    #[test]
    fn decommission_without_reason_rolls_back() {
        let conn = setup();
        let cfg = ImportConfig::default();
        let importer = Importer::new(&conn, &cfg);
        importer.upsert_individuales(&[json!({ "codigo_barras_individual": "I-1" })]);

        let report = importer.record_bajas(&[json!({ "equipo_id": 1 })]);
        assert_eq!(report.written, 0);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(individual_state(&conn, "I-1").0, "disponible");
    }

    #[test]
    fn batches_are_forced_in_process_and_upserted() {
        let conn = setup();
        let cfg = ImportConfig::default();
        let importer = Importer::new(&conn, &cfg);
        importer.upsert_tandas(&[json!({
            "numero_tanda": "T-1",
            "descripcion": "portatiles",
            "cantidad_equipos": 10,
            "valor_total": 1500.5,
            "estado": "cerrada"
        })]);
        conn.execute("UPDATE tandas_equipos_nuevos SET estado = 'recibida'", [])
            .expect("manual state change");
        let report = importer.upsert_tandas(&[json!({
            "numero_tanda": "T-1",
            "descripcion": "portatiles HP",
            "cantidad_equipos": 12
        })]);
        assert_eq!(report.written, 1);

        let (desc, cantidad, estado, valor): (String, i64, String, Option<f64>) = conn
            .query_row(
                "SELECT descripcion, cantidad_equipos, estado, valor_total FROM tandas_equipos_nuevos",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .expect("batch");
        assert_eq!(desc, "portatiles HP");
        assert_eq!(cantidad, 12);
        assert_eq!(estado, "recibida");
        assert_eq!(valor, None);
    }

    #[test]
    fn new_batch_state_ignores_payload() {
        let conn = setup();
        let cfg = ImportConfig::default();
        Importer::new(&conn, &cfg)
            .upsert_tandas(&[json!({ "numero_tanda": 3, "estado": "cerrada" })]);
        let (numero, estado): (String, String) = conn
            .query_row("SELECT numero_tanda, estado FROM tandas_equipos_nuevos", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .expect("batch");
        assert_eq!(numero, "3");
        assert_eq!(estado, "en_proceso");
    }

    #[test]
    fn document_sections_run_in_fixed_order() {
        let conn = setup();
        let cfg = ImportConfig::default();
        // Assignment listed first still sees the equipment written later in the document.
        let doc = json!({
            "equipos_asignados": [{ "codigo": "I-1", "asignado_a": "Nora" }],
            "equipos_individuales": [{ "codigo_barras_individual": "I-1" }],
            "equipos_extraterrestres": [{ "x": 1 }]
        });
        let outcome = Importer::new(&conn, &cfg).import_document(&doc).expect("import");
        assert_eq!(outcome.summary.equipos_individuales, 1);
        assert_eq!(outcome.summary.equipos_asignados, 1);
        assert_eq!(
            individual_state(&conn, "I-1"),
            ("asignado".to_string(), Some("Nora".to_string()))
        );
    }

    #[test]
    fn general_counter_is_sum_of_equipment_counters() {
        let conn = setup();
        let cfg = ImportConfig::default();
        let doc = json!({
            "equipos_agrupados": [{ "codigo_barras_unificado": "G-1" }],
            "inventario_general": {
                "agrupados": [{ "codigo_barras_unificado": "G-2" }],
                "individuales": [
                    { "codigo_barras_individual": "I-1" },
                    { "codigo_barras_individual": "I-2" }
                ]
            }
        });
        let s = Importer::new(&conn, &cfg)
            .import_document(&doc)
            .expect("import")
            .summary;
        assert_eq!(s.equipos_agrupados, 2);
        assert_eq!(s.equipos_individuales, 2);
        assert_eq!(s.inventario_general, s.equipos_agrupados + s.equipos_individuales);
    }

    #[test]
    fn general_counter_stays_zero_when_section_absent() {
        let conn = setup();
        let cfg = ImportConfig::default();
        let doc = json!({ "equipos_agrupados": [{ "codigo_barras_unificado": "G-1" }] });
        let s = Importer::new(&conn, &cfg)
            .import_document(&doc)
            .expect("import")
            .summary;
        assert_eq!(s.equipos_agrupados, 1);
        assert_eq!(s.inventario_general, 0);
    }

    #[test]
    fn non_list_sections_and_non_object_documents() {
        let conn = setup();
        let cfg = ImportConfig::default();
        let importer = Importer::new(&conn, &cfg);
        let s = importer
            .import_document(&json!({ "tandas_nuevas": { "numero_tanda": "T-1" } }))
            .expect("import")
            .summary;
        assert_eq!(s, ImportSummary::default());

        let err = importer.import_document(&json!([1, 2])).expect_err("array document");
        assert!(matches!(err, ImportError::MalformedInput(_)));
    }

    #[test]
    fn read_document_reports_missing_and_malformed_files() {
        let dir = std::env::temp_dir().join(format!(
            "wm-read-doc-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("create temp dir");

        let missing = read_document(&dir.join("nope.json")).expect_err("missing");
        assert!(matches!(missing, ImportError::FileNotFound(_)));
        assert!(missing.to_string().contains("not found"));

        let bad = dir.join("bad.json");
        std::fs::write(&bad, "{ \"equipos_baja\": [").expect("write");
        let malformed = read_document(&bad).expect_err("malformed");
        assert!(matches!(malformed, ImportError::MalformedInput(_)));
        assert!(malformed.to_string().starts_with("Invalid JSON"));
    }

    #[test]
    fn import_section_rejects_general() {
        let conn = setup();
        let cfg = ImportConfig::default();
        let err = Importer::new(&conn, &cfg)
            .import_section(
                Path::new("general.csv"),
                Section::InventarioGeneral,
                &[json!({ "codigo_barras_unificado": "G-1" })],
            )
            .expect_err("general");
        assert!(matches!(err, ImportError::UnknownSection(_)));
        let grouped: i64 = conn
            .query_row("SELECT COUNT(*) FROM equipos_agrupados", [], |r| r.get(0))
            .expect("count");
        assert_eq!(grouped, 0);
    }

    #[test]
    fn import_section_runs_only_that_section() {
        let conn = setup();
        let cfg = ImportConfig::default();
        let outcome = Importer::new(&conn, &cfg)
            .import_section(
                Path::new("tandas.csv"),
                Section::TandasNuevas,
                &[json!({ "numero_tanda": "T-1" }), json!({ "descripcion": "sin tanda" })],
            )
            .expect("import");
        assert_eq!(outcome.summary.tandas_nuevas, 1);
        assert_eq!(outcome.summary.total(), 1);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].section, Section::TandasNuevas);
    }
}
