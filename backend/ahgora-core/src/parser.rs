// src/parser.rs

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AhgoraError, Result};

/// Number of `<td>` cells a punches-table data row carries. Header and footer rows differ.
pub const PUNCH_ROW_CELLS: usize = 8;

const DATE_CELL: usize = 0;
const PUNCHES_CELL: usize = 2;

static TABLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<table\b.*?>.*?</table\s*>").unwrap());
static ROW_OPEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<tr\b[^>]*>").unwrap());
// `</tr>` is optional in HTML, so a row also ends where the next one starts.
static ROW_END_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<tr\b|</tr\s*>|</t(?:able|body|head|foot)\s*>").unwrap());
static CELL_OPEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<td\b[^>]*>").unwrap());
static CELL_END_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<t[dh]\b|</t[dh]\s*>|</tr\s*>").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static ENTITY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap());
static PUNCH_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]{2}:[0-9]{2}").unwrap());
static BALANCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(-)?([0-9]{2})([0-9]{2})$").unwrap());

/// One day as printed by the portal, before its punches are turned into timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRow {
    pub date_label: String,
    pub punch_tokens: Vec<String>,
    pub balance: Option<DayBalance>,
}

/// Shortage and overtime of a day, each as `[-]HH:MM`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayBalance {
    pub shortage: String,
    pub overtime: String,
}

impl Default for DayBalance {
    fn default() -> Self {
        Self {
            shortage: ZERO_BALANCE.to_string(),
            overtime: ZERO_BALANCE.to_string(),
        }
    }
}

const ZERO_BALANCE: &str = "00:00";

/// Which response format to read rows from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Html,
    Json,
}

/// The two tables of the classic punches page, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTables<'a> {
    pub summary: &'a str,
    pub punches: &'a str,
}

/// Extracts attendance rows from a raw body in the given mode.
pub fn extract_rows(raw_body: &str, mode: ParseMode) -> Result<Vec<AttendanceRow>> {
    match mode {
        ParseMode::Html => extract_html_rows(raw_body),
        ParseMode::Json => {
            let payload: Value = serde_json::from_str(raw_body)?;
            extract_json_rows(&payload)
        }
    }
}

// --- HTML ---

pub fn page_tables(body: &str) -> Result<PageTables<'_>> {
    let mut tables = TABLE_RE.find_iter(body).map(|m| m.as_str());
    match (tables.next(), tables.next()) {
        (Some(summary), Some(punches)) => Ok(PageTables { summary, punches }),
        (first, _) => Err(AhgoraError::TableNotFound {
            found: usize::from(first.is_some()),
        }),
    }
}

pub fn extract_html_rows(body: &str) -> Result<Vec<AttendanceRow>> {
    let tables = page_tables(body)?;
    Ok(parse_punches_table(tables.punches))
}

fn parse_punches_table(table: &str) -> Vec<AttendanceRow> {
    tag_blocks(table, &ROW_OPEN_RE, &ROW_END_RE)
        .into_iter()
        .map(|row| tag_blocks(row, &CELL_OPEN_RE, &CELL_END_RE))
        .filter(|cells| cells.len() == PUNCH_ROW_CELLS)
        .map(|cells| AttendanceRow {
            date_label: cell_text(cells[DATE_CELL]).trim().to_string(),
            punch_tokens: punch_tokens(&cell_text(cells[PUNCHES_CELL])),
            balance: None,
        })
        .collect()
}

/// Inner markup of every element opened by `open`, each running up to the first `end` match
/// after its opening tag or to the end of `html`.
fn tag_blocks<'a>(html: &'a str, open: &Regex, end: &Regex) -> Vec<&'a str> {
    let mut blocks = Vec::new();
    let mut pos = 0;
    while let Some(tag) = open.find_at(html, pos) {
        let start = tag.end();
        let stop = end
            .find_at(html, start)
            .map(|m| m.start())
            .unwrap_or(html.len());
        blocks.push(&html[start..stop]);
        pos = stop;
    }
    blocks
}

/// Text content of a cell: tags dropped, entities decoded.
pub fn cell_text(inner_html: &str) -> String {
    decode_entities(&TAG_RE.replace_all(inner_html, " "))
}

pub fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(entity)
            };
            decoded.map(String::from).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "nbsp" => ' ',
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "atilde" => 'ã',
        "otilde" => 'õ',
        "aacute" => 'á',
        "eacute" => 'é',
        "iacute" => 'í',
        "oacute" => 'ó',
        "uacute" => 'ú',
        "acirc" => 'â',
        "ecirc" => 'ê',
        "ocirc" => 'ô',
        "agrave" => 'à',
        "ccedil" => 'ç',
        "Atilde" => 'Ã',
        "Otilde" => 'Õ',
        "Aacute" => 'Á',
        "Eacute" => 'É',
        "Iacute" => 'Í',
        "Oacute" => 'Ó',
        "Uacute" => 'Ú',
        "Ccedil" => 'Ç',
        _ => return None,
    };
    Some(c)
}

/// Every `HH:MM` in `text`, left to right.
pub fn punch_tokens(text: &str) -> Vec<String> {
    PUNCH_TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

// --- JSON ---

#[derive(Debug, Clone, Deserialize)]
struct Batida {
    hora: String,
}

// Only FALTA and Extra entries are read, the rest may carry any shape.
#[derive(Debug, Clone, Deserialize)]
struct Resultado {
    #[serde(default)]
    tipo: Option<String>,
    #[serde(default)]
    valor: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct DayRecord {
    #[serde(alias = "punches", default)]
    batidas: Vec<Batida>,
    #[serde(default)]
    resultado: Vec<Value>,
}

/// Fails with `BackendError` when the payload carries a top-level `error`.
pub fn check_backend_error(payload: &Value) -> Result<()> {
    match payload.get("error") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(message)) => Err(AhgoraError::BackendError(message.clone())),
        Some(other) => Err(AhgoraError::BackendError(other.to_string())),
    }
}

pub fn extract_json_rows(payload: &Value) -> Result<Vec<AttendanceRow>> {
    check_backend_error(payload)?;

    let dias = match payload.get("dias") {
        Some(Value::Object(dias)) => dias,
        // PHP encodes an empty day map as a list.
        Some(Value::Array(days)) if days.is_empty() => return Ok(Vec::new()),
        _ => {
            return Err(AhgoraError::ParseFailure(
                "payload has no `dias` object".to_string(),
            ))
        }
    };

    let mut rows = Vec::with_capacity(dias.len());
    for (label, day) in dias {
        let record: DayRecord = serde_json::from_value(day.clone())?;
        rows.push(AttendanceRow {
            date_label: label.clone(),
            punch_tokens: record.batidas.iter().map(|b| hora_to_token(&b.hora)).collect(),
            balance: Some(day_balance(&record.resultado)),
        });
    }
    Ok(rows)
}

/// `"0801"` becomes `"08:01"`. Anything else is passed through split the same way and left for
/// timestamp parsing to reject.
fn hora_to_token(hora: &str) -> String {
    let hour = hora.get(0..2).unwrap_or(hora);
    let minute = hora.get(2..4).unwrap_or("");
    format!("{}:{}", hour, minute)
}

fn day_balance(resultado: &[Value]) -> DayBalance {
    let entries: Vec<Resultado> = resultado
        .iter()
        .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
        .collect();
    let first_of = |tipo: &str| {
        entries
            .iter()
            .filter(|r| r.tipo.as_deref() == Some(tipo))
            .find_map(|r| balance_value(r.valor.as_ref()?))
            .unwrap_or_else(|| ZERO_BALANCE.to_string())
    };
    DayBalance {
        shortage: first_of("FALTA"),
        overtime: first_of("Extra"),
    }
}

fn balance_value(valor: &Value) -> Option<String> {
    match valor {
        Value::String(valor) => Some(format_balance(valor)),
        Value::Number(valor) => Some(format_balance(&valor.to_string())),
        _ => None,
    }
}

/// Inserts a colon before the last two digits of a `[-]HHMM` value, keeping the sign.
/// Values not shaped like that are returned unchanged.
pub fn format_balance(value: &str) -> String {
    BALANCE_RE.replace(value, "${1}${2}:${3}").into_owned()
}

/// Employee data the REST backend returns alongside the punches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeProfile {
    #[serde(rename = "nome", default)]
    pub name: Option<String>,
    #[serde(rename = "cargo", default)]
    pub role: Option<String>,
    #[serde(rename = "departamento", default)]
    pub department: Option<String>,
}

impl EmployeeProfile {
    /// A profile with every field reported as not available.
    pub fn not_available() -> Self {
        Self::default()
    }
}

pub fn extract_profile(payload: &Value) -> Result<EmployeeProfile> {
    check_backend_error(payload)?;
    match payload.get("funcionario") {
        Some(funcionario) if funcionario.is_object() => Ok(serde_json::from_value(funcionario.clone())?),
        _ => Ok(EmployeeProfile::not_available()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(cells: &[&str]) -> String {
        let tds: String = cells.iter().map(|c| format!("<td>{}</td>", c)).collect();
        format!("<tr>{}</tr>", tds)
    }

    fn page(punch_rows: &[String]) -> String {
        format!(
            "<html><body>\
             <table class=\"summary\"><tr><td>Saldo</td><td>10:00</td></tr></table>\
             <table id=\"batidas\"><tr><th>Data</th><th>Batidas</th></tr>{}</table>\
             </body></html>",
            punch_rows.concat()
        )
    }

    #[test]
    fn eight_cell_row_yields_date_and_tokens() {
        let body = page(&[row(&["2024-05-03", "", "08:01 12:00 13:00 18:05", "", "", "", "", ""])]);

        let rows = extract_rows(&body, ParseMode::Html).unwrap();
        assert_eq!(
            rows,
            vec![AttendanceRow {
                date_label: "2024-05-03".to_string(),
                punch_tokens: vec!["08:01", "12:00", "13:00", "18:05"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                balance: None,
            }]
        );
    }

    #[test]
    fn rows_with_other_arity_are_skipped() {
        let body = page(&[
            row(&["2024-05-01", "", "08:00", "", "", "", ""]),
            row(&["2024-05-02", "", "08:00", "", "", "", "", "", ""]),
            row(&["2024-05-03", "", "09:00", "", "", "", "", ""]),
        ]);

        let rows = extract_html_rows(&body).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date_label, "2024-05-03");
    }

    #[test]
    fn summary_table_is_ignored() {
        let summary_row = row(&["2024-04-01", "", "07:00", "", "", "", "", ""]);
        let body = format!(
            "<table>{}</table><table>{}</table>",
            summary_row,
            row(&["2024-05-03", "", "10:00", "", "", "", "", ""])
        );
        let rows = extract_html_rows(&body).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].punch_tokens, vec!["10:00".to_string()]);
    }

    #[test]
    fn markup_and_whitespace_in_cells_are_stripped() {
        let body = page(&[format!(
            "<TR class=\"odd\"><td>\n  2024-05-06 <br/></td><td>Seg</td>\
             <td><span class=\"p\">08:00</span>&nbsp;<b>12:01</b>\n</td>{}</TR>",
            "<td></td>".repeat(5)
        )]);
        let rows = extract_html_rows(&body).unwrap();
        assert_eq!(rows[0].date_label, "2024-05-06");
        assert_eq!(rows[0].punch_tokens, vec!["08:00".to_string(), "12:01".to_string()]);
    }

    #[test]
    fn day_without_punches_has_no_tokens() {
        let body = page(&[row(&["2024-05-04", "Sab", "", "", "", "", "", ""])]);
        let rows = extract_html_rows(&body).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].punch_tokens.is_empty());
    }

    #[test]
    fn fewer_than_two_tables_is_table_not_found() {
        assert!(matches!(
            extract_html_rows("<html><table><tr><td>x</td></tr></table></html>"),
            Err(AhgoraError::TableNotFound { found: 1 })
        ));
        assert!(matches!(
            extract_html_rows(""),
            Err(AhgoraError::TableNotFound { found: 0 })
        ));
    }

    #[test]
    fn omitted_end_tags_still_delimit_rows_and_cells() {
        let body = "<table><tr><td>Saldo</table>\
                    <table><tr><th>Data<th>Batidas\
                    <TR><td>2024-05-03<td>Sex<td>08:00 12:00<td><td><td><td><td>\
                    <tr><td>2024-05-04<td><td>09:15<td><td><td><td><td></tr>\
                    </table>";

        let rows = extract_html_rows(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date_label, "2024-05-03");
        assert_eq!(rows[0].punch_tokens, vec!["08:00".to_string(), "12:00".to_string()]);
        assert_eq!(rows[1].date_label, "2024-05-04");
        assert_eq!(rows[1].punch_tokens, vec!["09:15".to_string()]);
    }

    #[test]
    fn short_row_without_end_tags_is_skipped() {
        let body = "<table></table><table><tr><td>2024-05-03</td></table>";
        assert!(extract_html_rows(body).unwrap().is_empty());
    }

    #[test]
    fn only_ascii_digits_form_punch_tokens() {
        assert_eq!(punch_tokens("٠٨:٠٠ 08:00 ０９:３０"), vec!["08:00".to_string()]);
    }

    #[test]
    fn tables_are_taken_in_document_order() {
        let body = "<p>x</p><TABLE a=1>first</TABLE><table>second</table><table>third</table>";
        let tables = page_tables(body).unwrap();
        assert_eq!(tables.summary, "<TABLE a=1>first</TABLE>");
        assert_eq!(tables.punches, "<table>second</table>");
    }

    #[test]
    fn entities_are_decoded() {
        assert_eq!(decode_entities("n&atilde;o &amp; &#227; &#xE3; &bogus;"), "não & ã ã &bogus;");
    }

    #[test]
    fn json_rows_split_hora_and_keep_day_order() {
        let payload = json!({
            "dias": {
                "2024-05-03": {
                    "batidas": [{"hora": "0801"}, {"hora": "1200"}],
                    "resultado": [
                        {"tipo": "FALTA", "valor": "-0130"},
                        {"tipo": "Extra", "valor": "0045"},
                        {"tipo": "Normal", "valor": "0800"}
                    ]
                },
                "2024-05-01": {
                    "batidas": [],
                    "resultado": []
                }
            }
        });

        let rows = extract_json_rows(&payload).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date_label, "2024-05-03");
        assert_eq!(rows[0].punch_tokens, vec!["08:01".to_string(), "12:00".to_string()]);
        assert_eq!(
            rows[0].balance,
            Some(DayBalance {
                shortage: "-01:30".to_string(),
                overtime: "00:45".to_string(),
            })
        );
        assert_eq!(rows[1].date_label, "2024-05-01");
        assert_eq!(rows[1].balance, Some(DayBalance::default()));
    }

    #[test]
    fn empty_dias_list_yields_no_rows() {
        assert!(extract_json_rows(&json!({"dias": []})).unwrap().is_empty());
        assert!(matches!(
            extract_json_rows(&json!({"dias": ["2024-05-03"]})),
            Err(AhgoraError::ParseFailure(_))
        ));
    }

    #[test]
    fn unrelated_resultado_entries_are_ignored_whatever_their_shape() {
        let payload = json!({
            "dias": {
                "2024-05-03": {
                    "batidas": [{"hora": "0800"}],
                    "resultado": [
                        {"tipo": "Normal", "valor": 800},
                        {"tipo": "Intervalo"},
                        {"tipo": "FALTA", "valor": "-0015"},
                        {"tipo": "Extra", "valor": "0100"}
                    ]
                }
            }
        });

        let rows = extract_json_rows(&payload).unwrap();
        assert_eq!(rows[0].punch_tokens, vec!["08:00".to_string()]);
        assert_eq!(
            rows[0].balance,
            Some(DayBalance {
                shortage: "-00:15".to_string(),
                overtime: "01:00".to_string(),
            })
        );
    }

    #[test]
    fn json_punches_alias_is_accepted() {
        let payload = json!({"dias": {"2024-05-03": {"punches": [{"hora": "0930"}]}}});
        let rows = extract_json_rows(&payload).unwrap();
        assert_eq!(rows[0].punch_tokens, vec!["09:30".to_string()]);
    }

    #[test]
    fn json_error_field_is_backend_error() {
        let payload = json!({"error": "invalid credentials"});
        match extract_json_rows(&payload) {
            Err(AhgoraError::BackendError(message)) => assert_eq!(message, "invalid credentials"),
            other => panic!("expected BackendError, got {:?}", other),
        }
    }

    #[test]
    fn json_mode_rejects_non_json_body() {
        assert!(matches!(
            extract_rows("<html>oops</html>", ParseMode::Json),
            Err(AhgoraError::JsonDecode(_))
        ));
    }

    #[test]
    fn balance_formatting_keeps_sign_and_ignores_other_shapes() {
        assert_eq!(format_balance("0130"), "01:30");
        assert_eq!(format_balance("-0005"), "-00:05");
        assert_eq!(format_balance("12:00"), "12:00");
        assert_eq!(format_balance("130"), "130");
    }

    #[test]
    fn profile_is_read_from_funcionario() {
        let payload = json!({
            "funcionario": {"nome": "Maria Silva", "cargo": "Analista", "departamento": "TI"},
            "dias": {}
        });
        let profile = extract_profile(&payload).unwrap();
        assert_eq!(profile.name.as_deref(), Some("Maria Silva"));
        assert_eq!(profile.role.as_deref(), Some("Analista"));
        assert_eq!(profile.department.as_deref(), Some("TI"));

        let missing = extract_profile(&json!({"dias": {}})).unwrap();
        assert_eq!(missing, EmployeeProfile::not_available());
    }
}
