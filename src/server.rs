//! Line-delimited JSON-RPC 2.0 over stdio, exposing the workspace as tools.
//!
//! One request per line, one response per line. Requests are handled in order.

use crate::error::SheetSqlError;
use crate::workspace::Workspace;
use serde_json::json;
use serde_json::Map;
use serde_json::Value as JsonValue;
use std::io::BufRead;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INTERNAL_ERROR: i64 = -32603;
const DIRECTORY_ERROR: i64 = -32000;

/// Keys some clients wrap tool arguments in.
const ARGUMENT_WRAPPERS: [&str; 4] = ["args", "parameters", "params", "arguments"];

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Missing argument '{0}'")]
    MissingArgument(String),

    #[error("Unknown tool '{0}'")]
    UnknownTool(String),
}

pub struct Server {
    workspace: Workspace,
    running: bool,
}

impl Server {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            running: true,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Serves requests until input ends or a shutdown request arrives.
    pub fn serve<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<(), SheetSqlError> {
        info!("Serving JSON-RPC on stdio");
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(&line) {
                writeln!(output, "{}", serde_json::to_string(&response)?)?;
                output.flush()?;
            }
            if !self.running {
                info!("Shutdown requested");
                break;
            }
        }
        Ok(())
    }

    pub fn handle_line(&mut self, line: &str) -> Option<JsonValue> {
        match serde_json::from_str::<JsonValue>(line) {
            Ok(request) => self.handle(&request),
            Err(error) => {
                warn!("Malformed request: {}", error);
                Some(error_response(&JsonValue::Null, PARSE_ERROR, "Parse error", &error.to_string()))
            }
        }
    }

    /// Response to one request; notifications (no id) get none.
    pub fn handle(&mut self, request: &JsonValue) -> Option<JsonValue> {
        let method = request.get("method").and_then(JsonValue::as_str).unwrap_or_default();
        let id = request.get("id").cloned();
        debug!("Request '{}' with id {:?}", method, id);
        let response = match method {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": { "listChanged": false } },
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                },
            })),
            "initialized" | "notifications/initialized" => Ok(JsonValue::Null),
            "ping" => Ok(json!({})),
            "shutdown" => {
                self.running = false;
                Ok(JsonValue::Null)
            }
            "tools/list" | "list_tools" => Ok(json!({ "tools": tool_definitions() })),
            "tools/call" | "call_tool" => {
                let params = request.get("params").cloned().unwrap_or(JsonValue::Null);
                let name = params.get("name").and_then(JsonValue::as_str).unwrap_or_default().to_owned();
                let arguments = unwrap_arguments(params.get("arguments").cloned().unwrap_or(JsonValue::Null));
                self.call_tool(&name, &arguments)
            }
            method => Err((METHOD_NOT_FOUND, "Method not found".to_owned(), format!("Unknown method: {method}"))),
        };
        let id = id?;
        Some(match response {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
            Err((code, message, data)) => error_response(&id, code, &message, &data),
        })
    }

    fn call_tool(&mut self, name: &str, arguments: &Map<String, JsonValue>) -> Result<JsonValue, (i64, String, String)> {
        let has_directory = self.workspace.directory().is_some_and(Path::is_dir);
        if name != "excel_change_directory" && !has_directory {
            return Err((
                DIRECTORY_ERROR,
                "Workbook directory is missing or not set".to_owned(),
                "Use 'excel_change_directory' to set a valid directory first".to_owned(),
            ));
        }
        match self.run_tool(name, arguments) {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result).unwrap_or_default();
                Ok(json!({ "content": [{ "type": "text", "text": text }] }))
            }
            Err(error @ (SheetSqlError::DirectoryNotSet | SheetSqlError::DirectoryNotFound(_))) => {
                Err((DIRECTORY_ERROR, "Workbook directory is missing or not set".to_owned(), error.to_string()))
            }
            Err(error) => {
                warn!("Tool '{}' failed: {}", name, error);
                Err((INTERNAL_ERROR, "Internal error".to_owned(), error.to_string()))
            }
        }
    }

    fn run_tool(&mut self, name: &str, arguments: &Map<String, JsonValue>) -> Result<JsonValue, SheetSqlError> {
        let workspace = &mut self.workspace;
        let value = match name {
            "excel_show_tables" => serde_json::to_value(workspace.list_tables()?)?,
            "excel_list_sheets" => JsonValue::Array(
                workspace
                    .workbooks()
                    .iter()
                    .map(|workbook| json!({ "file": workbook.file_name, "tables": workbook.table_names() }))
                    .collect(),
            ),
            "excel_list_files" => serde_json::to_value(workspace.list_files())?,
            "excel_get_directory" => json!({
                "directory": workspace.directory().map(|path| path.display().to_string()),
            }),
            "excel_query" => serde_json::to_value(workspace.run_statement(argument(arguments, "sql")?)?)?,
            "excel_get_table_schema" => table_schema(workspace, argument(arguments, "table_name")?)?,
            "excel_refresh_cache" => {
                let tables = workspace.refresh()?;
                json!({ "tables": tables, "message": "Cache refreshed" })
            }
            "excel_change_directory" => {
                serde_json::to_value(workspace.change_directory(Path::new(argument(arguments, "directory")?))?)?
            }
            "excel_save_all" => {
                let saved = workspace.save_all()?;
                json!({ "saved_files": saved, "message": format!("Saved {saved} file(s)") })
            }
            "excel_save_file" => {
                let file_name = argument(arguments, "file_name")?;
                let saved = workspace.save_one(file_name)?;
                json!({
                    "success": true,
                    "saved_tables": saved,
                    "message": format!("Saved {saved} table(s) to {file_name}"),
                })
            }
            "excel_undo_changes" => {
                let discarded = workspace.undo()?;
                json!({
                    "discarded_tables": discarded,
                    "message": format!("Discarded changes to {} table(s)", discarded.len()),
                })
            }
            "excel_get_stats" => serde_json::to_value(workspace.get_stats()?)?,
            name => Err(ServerError::UnknownTool(name.to_owned()))?,
        };
        Ok(value)
    }
}

/// Schema of one table, or of every table of a workbook when `name` is a file.
fn table_schema(workspace: &Workspace, name: &str) -> Result<JsonValue, SheetSqlError> {
    let error = match workspace.get_create_table(name) {
        Ok(create_table) => {
            let table = workspace.list_tables()?.into_iter().find(|table| table.eq_ignore_ascii_case(name));
            return Ok(json!({ "table": table.unwrap_or_else(|| name.to_owned()), "createTable": create_table }));
        }
        Err(error @ SheetSqlError::TableNotFound { .. }) => error,
        Err(error) => return Err(error),
    };
    let workbook = workspace.workbooks().iter().find(|workbook| {
        let stem = Path::new(&workbook.file_name)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        workbook.file_name.eq_ignore_ascii_case(name) || stem.eq_ignore_ascii_case(name)
    });
    let Some(workbook) = workbook else {
        return Err(error);
    };
    let mut schemas = Vec::new();
    for table in workbook.table_names() {
        let create_table = workspace.get_create_table(&table)?;
        schemas.push(json!({ "table": table, "createTable": create_table }));
    }
    Ok(JsonValue::Array(schemas))
}

fn argument<'a>(arguments: &'a Map<String, JsonValue>, name: &str) -> Result<&'a str, SheetSqlError> {
    arguments
        .get(name)
        .and_then(JsonValue::as_str)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ServerError::MissingArgument(name.to_owned()).into())
}

/// Tool arguments as an object. JSON text is parsed, and a lone wrapper key is unwrapped.
pub fn unwrap_arguments(arguments: JsonValue) -> Map<String, JsonValue> {
    let arguments = match arguments {
        JsonValue::String(text) => serde_json::from_str(&text).unwrap_or(JsonValue::Null),
        arguments => arguments,
    };
    let JsonValue::Object(map) = arguments else {
        return Map::new();
    };
    if map.len() == 1 {
        if let Some((key, inner)) = map.iter().next() {
            if ARGUMENT_WRAPPERS.contains(&key.as_str()) {
                return unwrap_arguments(inner.to_owned());
            }
        }
    }
    map
}

fn error_response(id: &JsonValue, code: i64, message: &str, data: &str) -> JsonValue {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message, "data": data },
    })
}

fn tool(name: &str, description: &str, properties: JsonValue, required: &[&str]) -> JsonValue {
    json!({
        "name": name,
        "description": description,
        "inputSchema": { "type": "object", "properties": properties, "required": required },
    })
}

pub fn tool_definitions() -> Vec<JsonValue> {
    let none = || json!({});
    vec![
        tool("excel_show_tables", "List every table (one per worksheet)", none(), &[]),
        tool("excel_list_sheets", "List workbooks with the tables each provides", none(), &[]),
        tool("excel_list_files", "List the workbook files in the current directory", none(), &[]),
        tool("excel_get_directory", "Show the current workbook directory", none(), &[]),
        tool(
            "excel_query",
            "Run a statement: SELECT, UPDATE, DELETE, SHOW TABLES, SHOW CREATE TABLE. Table names are worksheet names",
            json!({ "sql": { "type": "string", "description": "Statement text" } }),
            &["sql"],
        ),
        tool(
            "excel_get_table_schema",
            "Show CREATE TABLE for a table, or for every table of a workbook file",
            json!({ "table_name": { "type": "string", "description": "Table or workbook file name" } }),
            &["table_name"],
        ),
        tool("excel_refresh_cache", "Reload every workbook from disk", none(), &[]),
        tool(
            "excel_change_directory",
            "Load workbooks from another directory",
            json!({ "directory": { "type": "string", "description": "Directory path" } }),
            &["directory"],
        ),
        tool("excel_save_all", "Write modified tables back to their workbooks", none(), &[]),
        tool(
            "excel_save_file",
            "Write the modified tables of one workbook",
            json!({ "file_name": { "type": "string", "description": "Workbook file name" } }),
            &["file_name"],
        ),
        tool("excel_undo_changes", "Discard unsaved changes by reloading from disk", none(), &[]),
        tool("excel_get_stats", "Show directory, file, table and row counts", none(), &[]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::criteria::Criteria;

    fn server() -> Server {
        Server::new(Workspace::new(Criteria::default()))
    }

    #[test]
    fn initialize_and_list_tools() {
        let mut server = server();
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .unwrap();
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);

        let response = server.handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"list_tools"}"#).unwrap();
        assert_eq!(response["result"]["tools"].as_array().unwrap().len(), 12);
        assert!(server.handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).is_none());
    }

    #[test]
    fn errors_use_json_rpc_codes() {
        let mut server = server();
        let response = server.handle_line("not json").unwrap();
        assert_eq!(response["error"]["code"], PARSE_ERROR);

        let response = server.handle_line(r#"{"jsonrpc":"2.0","id":3,"method":"nope"}"#).unwrap();
        assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"excel_show_tables"}}"#)
            .unwrap();
        assert_eq!(response["error"]["code"], DIRECTORY_ERROR);

        let response = server
            .handle_line(
                r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"excel_change_directory","arguments":{"directory":"/definitely/not/here"}}}"#,
            )
            .unwrap();
        assert_eq!(response["error"]["code"], DIRECTORY_ERROR);
    }

    #[test]
    fn arguments_are_unwrapped() {
        let arguments = unwrap_arguments(json!({ "params": { "sql": "SHOW TABLES" } }));
        assert_eq!(arguments["sql"], "SHOW TABLES");
        let arguments = unwrap_arguments(json!("{\"args\": {\"file_name\": \"a.xlsx\"}}"));
        assert_eq!(arguments["file_name"], "a.xlsx");
        assert!(unwrap_arguments(JsonValue::Null).is_empty());
    }

    #[test]
    fn serve_stops_on_shutdown() {
        let mut server = server();
        let input = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"shutdown\"}\n{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n";
        let mut output = Vec::new();
        server.serve(&input[..], &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
