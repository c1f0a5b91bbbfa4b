use crate::registry::CommandDescriptor;
use crate::types::{ArgField, ContainerRecipe, EventKind, ValidatedArgs};

const DOCUMENTATION: &str = "\
Executes a find and replace operation across files in a repository.

Required arguments:
- find_pattern: Text to find
- replace_text: Text to replace with

Optional arguments:
- file_pattern: Glob pattern for files to process (default: *)
";

fn accepts(_kind: EventKind) -> bool {
    true
}

fn build(args: &ValidatedArgs) -> String {
    let file_pattern = args.get("file_pattern").map(String::as_str).unwrap_or("*");
    let find_pattern = args.get("find_pattern").map(String::as_str).unwrap_or("");
    let replace_text = args.get("replace_text").map(String::as_str).unwrap_or("");
    format!(
        "find . -type f -name '{file_pattern}' -exec sed -i 's/{find_pattern}/{replace_text}/g' {{}} +"
    )
}

pub fn descriptor() -> CommandDescriptor {
    CommandDescriptor {
        name: "find_replace".into(),
        description: "Perform find and replace across files".into(),
        documentation: DOCUMENTATION.into(),
        schema: vec![
            ArgField::required("find_pattern"),
            ArgField::required("replace_text"),
            ArgField::optional("file_pattern", "*"),
        ],
        recipe: ContainerRecipe {
            dockerfile: "\
FROM python:3.9-slim
WORKDIR /workspace
RUN apt-get update && apt-get install -y findutils sed
"
            .into(),
        },
        accepts,
        build,
    }
}
