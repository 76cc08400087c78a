use serde_json::{Map, Value};

use crate::backend::{CellValue, ResultFrame};
use crate::error::DashError;
use crate::filter::FilterSet;
use crate::pagination::PageView;

/// JSON form of one cell. Temporal values render as ISO text; non-finite
/// floats become null.
pub fn cell_to_json(cell: &CellValue) -> Value {
    match cell {
        CellValue::Null => Value::Null,
        CellValue::Bool(b) => Value::Bool(*b),
        CellValue::Int(i) => Value::Number((*i).into()),
        CellValue::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
        CellValue::Text(s) => Value::String(s.clone()),
        CellValue::Date(_) | CellValue::DateTime(_) => Value::String(cell.to_string()),
    }
}

fn encode(value: &Value) -> Result<String, DashError> {
    toon_format::encode_default(value).map_err(|e| DashError::Format {
        message: e.to_string(),
    })
}

/// Insert `columns`, `types` and `rows` for a frame into `map`.
fn insert_frame(map: &mut Map<String, Value>, frame: &ResultFrame) {
    map.insert(
        "columns".to_string(),
        Value::Array(
            frame
                .columns
                .iter()
                .map(|c| Value::String(c.name.clone()))
                .collect(),
        ),
    );
    map.insert(
        "types".to_string(),
        Value::Array(
            frame
                .columns
                .iter()
                .map(|c| Value::String(c.type_name.clone()))
                .collect(),
        ),
    );

    let rows = frame
        .rows
        .iter()
        .map(|row| {
            let mut obj = Map::new();
            for (i, col) in frame.columns.iter().enumerate() {
                let cell = row.get(i).unwrap_or(&CellValue::Null);
                obj.insert(col.name.clone(), cell_to_json(cell));
            }
            Value::Object(obj)
        })
        .collect();
    map.insert("rows".to_string(), Value::Array(rows));
}

/// Convert a ResultFrame to a TOON document with `columns`, `types` and `rows`.
pub fn to_toon(frame: &ResultFrame) -> Result<String, DashError> {
    let mut map = Map::new();
    insert_frame(&mut map, frame);
    encode(&Value::Object(map))
}

/// A TOON document holding one named list of strings, e.g. `tables[2]: a,b`.
pub fn names_to_toon(key: &str, names: &[String]) -> Result<String, DashError> {
    let mut map = Map::new();
    map.insert(
        key.to_string(),
        Value::Array(names.iter().cloned().map(Value::String).collect()),
    );
    encode(&Value::Object(map))
}

/// Page position, active filters and the (filtered) rows of one page.
pub fn page_to_toon(
    view: &PageView,
    shown: &ResultFrame,
    filters: &FilterSet,
) -> Result<String, DashError> {
    let mut map = Map::new();
    map.insert(
        "table".to_string(),
        Value::String(view.request.table.to_string()),
    );
    map.insert("page".to_string(), Value::Number(view.request.page.into()));
    map.insert(
        "page_size".to_string(),
        Value::Number(view.request.page_size.into()),
    );
    map.insert("total_rows".to_string(), Value::Number(view.total_rows.into()));
    map.insert(
        "total_pages".to_string(),
        Value::Number(view.total_pages.into()),
    );
    map.insert(
        "loaded_rows".to_string(),
        Value::Number(view.frame.rows.len().into()),
    );

    if !filters.is_empty() {
        let applied = filters
            .iter()
            .map(|(column, filter)| (column.to_string(), Value::String(filter.to_string())))
            .collect::<Map<_, _>>();
        map.insert("filters".to_string(), Value::Object(applied));
    }

    insert_frame(&mut map, shown);
    encode(&Value::Object(map))
}
