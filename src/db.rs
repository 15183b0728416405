use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

pub fn open_db(db_path: &Path) -> anyhow::Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Creates the four inventory tables when they are missing. Existing tables
/// are left untouched.
pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS equipos_agrupados(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            codigo_barras_unificado TEXT UNIQUE,
            nit TEXT,
            sede_id INTEGER,
            asignado_anterior TEXT,
            asignado_actual TEXT,
            descripcion_general TEXT,
            estado_general TEXT DEFAULT 'disponible',
            creador_registro TEXT,
            fecha_creacion TEXT,
            trazabilidad_soporte TEXT,
            documentos_entrega TEXT,
            observaciones TEXT,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS equipos_individuales(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            codigo_barras_individual TEXT UNIQUE,
            entrada_oc_compra TEXT,
            cargado_nit TEXT,
            ciudad TEXT,
            tecnologia TEXT,
            serial TEXT,
            modelo TEXT,
            anterior_asignado TEXT,
            placa TEXT,
            marca TEXT,
            procesador TEXT,
            arch_ram TEXT,
            cantidad_ram TEXT,
            tipo_disco TEXT,
            espacio_disco TEXT,
            so TEXT,
            estado TEXT DEFAULT 'disponible',
            asignado_nuevo TEXT,
            fecha TEXT,
            fecha_llegada TEXT,
            area TEXT,
            marca_monitor TEXT,
            modelo_monitor TEXT,
            serial_monitor TEXT,
            placa_monitor TEXT,
            proveedor TEXT,
            oc TEXT,
            observaciones TEXT,
            disponible TEXT DEFAULT 'Si',
            sede_id INTEGER,
            creador_registro TEXT,
            fecha_creacion TEXT,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_equipos_individuales_estado ON equipos_individuales(estado)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS inventario_bajas(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            equipo_id INTEGER,
            tipo_inventario TEXT,
            motivo_baja TEXT NOT NULL,
            fecha_baja TEXT NOT NULL,
            responsable_baja TEXT,
            documentos_soporte TEXT,
            fotografias_soporte TEXT,
            observaciones TEXT,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_inventario_bajas_equipo ON inventario_bajas(equipo_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS tandas_equipos_nuevos(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            numero_tanda TEXT UNIQUE,
            descripcion TEXT,
            fecha_ingreso TEXT,
            cantidad_equipos INTEGER DEFAULT 0,
            proveedor TEXT,
            valor_total REAL DEFAULT 0,
            estado TEXT DEFAULT 'en_proceso',
            observaciones TEXT,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    Ok(())
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStats {
    pub total_equipos: i64,
    pub equipos_individuales: i64,
    pub equipos_agrupados: i64,
    pub equipos_disponibles: i64,
    pub equipos_asignados: i64,
    pub equipos_baja: i64,
    pub por_tecnologia: BTreeMap<String, i64>,
    pub por_estado: BTreeMap<String, i64>,
}

pub fn inventory_stats(conn: &Connection) -> anyhow::Result<InventoryStats> {
    let mut stats = InventoryStats {
        equipos_individuales: conn.query_row("SELECT COUNT(*) FROM equipos_individuales", [], |r| {
            r.get(0)
        })?,
        equipos_agrupados: conn.query_row("SELECT COUNT(*) FROM equipos_agrupados", [], |r| r.get(0))?,
        ..InventoryStats::default()
    };
    stats.total_equipos = stats.equipos_individuales + stats.equipos_agrupados;

    let mut stmt =
        conn.prepare("SELECT estado, COUNT(*) FROM equipos_individuales GROUP BY estado")?;
    let rows = stmt
        .query_map([], |r| Ok((r.get::<_, Option<String>>(0)?, r.get::<_, i64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    for (estado, n) in rows {
        let estado = estado.unwrap_or_else(|| "sin_estado".to_string());
        match estado.to_lowercase().as_str() {
            "disponible" => stats.equipos_disponibles += n,
            "asignado" => stats.equipos_asignados += n,
            "baja" => stats.equipos_baja += n,
            _ => {}
        }
        *stats.por_estado.entry(estado).or_insert(0) += n;
    }

    let mut stmt = conn.prepare(
        "SELECT tecnologia, COUNT(*) FROM equipos_individuales
         WHERE tecnologia IS NOT NULL AND tecnologia != ''
         GROUP BY tecnologia",
    )?;
    let rows = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    stats.por_tecnologia.extend(rows);

    Ok(stats)
}
