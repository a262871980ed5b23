// src/common/csv_utils.rs

use crate::common::error::AppError;

// ---
// O invólucro fino de CSV dos imports
// ---
// As células chegam como bytes crus: a validação UTF-8 é por célula e vira
// erro de LINHA nos validadores, nunca derruba o arquivo inteiro.
#[derive(Debug, Clone)]
pub struct CsvRow {
    // 1-based, contando o cabeçalho como linha 1.
    pub row_number: usize,
    pub cells: Vec<Vec<u8>>,
}

/// Tokeniza o payload e valida o cabeçalho: contagem exata de colunas e
/// nomes exatos (comparação case-insensitive, ordem fixa). Devolve apenas as
/// linhas de dados.
pub fn parse_csv(payload: &[u8], expected_columns: &[&str]) -> Result<Vec<CsvRow>, AppError> {
    let records = split_records(payload);
    if records.is_empty() {
        return Err(AppError::EmptyCsv);
    }

    let header = &records[0];
    if header.len() != expected_columns.len() {
        return Err(AppError::InvalidCsvFormat(format!(
            "wrong number of columns, expected {}, got {}",
            expected_columns.len(),
            header.len()
        )));
    }
    for (i, expected) in expected_columns.iter().enumerate() {
        let actual = String::from_utf8_lossy(&header[i]);
        if !actual.trim().eq_ignore_ascii_case(expected) {
            return Err(AppError::InvalidCsvFormat(format!(
                "csv has invalid format, column number {} should be {}, got {}",
                i + 1,
                expected,
                actual.trim()
            )));
        }
    }

    if records.len() == 1 {
        return Err(AppError::EmptyCsv);
    }

    Ok(records
        .into_iter()
        .enumerate()
        .skip(1)
        .map(|(i, cells)| CsvRow { row_number: i + 1, cells })
        .collect())
}

// Separa registros e células respeitando aspas (aspas duplas escapadas com
// ""). Linhas em branco são descartadas; toda célula sai com as bordas
// aparadas.
fn split_records(payload: &[u8]) -> Vec<Vec<Vec<u8>>> {
    let mut records = Vec::new();
    let mut record: Vec<Vec<u8>> = Vec::new();
    let mut cell: Vec<u8> = Vec::new();
    let mut in_quotes = false;

    let mut i = 0;
    while i < payload.len() {
        let b = payload[i];
        match b {
            b'"' => {
                if in_quotes && payload.get(i + 1) == Some(&b'"') {
                    cell.push(b'"');
                    i += 1;
                } else {
                    in_quotes = !in_quotes;
                }
            }
            b',' if !in_quotes => {
                record.push(trim_cell(cell));
                cell = Vec::new();
            }
            b'\n' if !in_quotes => {
                record.push(trim_cell(cell));
                cell = Vec::new();
                push_record(&mut records, record);
                record = Vec::new();
            }
            _ => cell.push(b),
        }
        i += 1;
    }
    record.push(trim_cell(cell));
    push_record(&mut records, record);

    records
}

fn push_record(records: &mut Vec<Vec<Vec<u8>>>, record: Vec<Vec<u8>>) {
    if record.iter().any(|cell| !cell.is_empty()) {
        records.push(record);
    }
}

fn trim_cell(cell: Vec<u8>) -> Vec<u8> {
    let start = cell
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(cell.len());
    let end = cell
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |p| p + 1);
    cell[start..end].to_vec()
}

/// Booleano no vocabulário estrito dos arquivos de importação
/// (1/t/T/TRUE/true/True e os equivalentes falsos).
pub fn parse_bool_cell(value: &str) -> Result<bool, String> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        other => Err(format!("{other} is not a valid boolean")),
    }
}

// ---
// Escrita (exportações)
// ---

/// Monta um CSV com todas as células entre aspas, com newline final,
/// no formato fixo que os clientes de exportação esperam.
pub fn write_csv(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    out.push_str(&quoted_line(header.iter().map(|s| s.to_string()).collect::<Vec<_>>().as_slice()));
    for row in rows {
        out.push_str(&quoted_line(row));
    }
    out
}

fn quoted_line(cells: &[String]) -> String {
    let mut line = cells
        .iter()
        .map(|c| format!("\"{}\"", c.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}
