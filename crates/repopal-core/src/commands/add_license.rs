use crate::registry::CommandDescriptor;
use crate::types::{ArgField, ContainerRecipe, EventKind, ValidatedArgs};

const DOCUMENTATION: &str = "\
Writes a LICENSE file containing the canonical text of a named license.

Optional arguments:
- license: Which license to write (default: MIT; MIT is the only license currently supported)
- holder: Copyright holder name (default: \"the copyright holders\")
- year: Copyright year (default: the current year)
";

const MIT_TEMPLATE: &str = "MIT License

Copyright (c) {year} {holder}

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the \"Software\"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED \"AS IS\", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
";

fn accepts(_kind: EventKind) -> bool {
    true
}

fn mit_text(args: &ValidatedArgs) -> String {
    let year = match args.get("year") {
        Some(year) if !year.is_empty() => year.clone(),
        _ => chrono::Utc::now().format("%Y").to_string(),
    };
    let holder = args.get("holder").map(String::as_str).unwrap_or("the copyright holders");
    MIT_TEMPLATE.replace("{year}", &year).replace("{holder}", holder)
}

fn build(args: &ValidatedArgs) -> String {
    // LICENSE is written untracked on purpose: C5 picks it up via
    // `git ls-files --others`, exercising the untracked-file path.
    let text = mit_text(args);
    let escaped = text.replace('\'', "'\\''");
    format!("printf '%s' '{escaped}' > LICENSE")
}

pub fn descriptor() -> CommandDescriptor {
    CommandDescriptor {
        name: "add_license".into(),
        description: "Write a LICENSE file with a named license's text".into(),
        documentation: DOCUMENTATION.into(),
        schema: vec![
            ArgField::optional("license", "MIT"),
            ArgField::optional("holder", "the copyright holders"),
            ArgField::optional("year", ""),
        ],
        recipe: ContainerRecipe {
            dockerfile: "\
FROM python:3.9-slim
WORKDIR /workspace
"
            .into(),
        },
        accepts,
        build,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn build_embeds_holder_in_printf_command() {
        let descriptor = descriptor();
        let mut raw = HashMap::new();
        raw.insert("holder".to_string(), "Acme Corp".to_string());
        raw.insert("year".to_string(), "2024".to_string());
        let validated = descriptor.validate_args(&raw).unwrap();
        let command = descriptor.execution_string(&validated);
        assert!(command.contains("Acme Corp"));
        assert!(command.contains("2024"));
        assert!(command.starts_with("printf"));
    }

    #[test]
    fn license_defaults_to_mit_without_explicit_argument() {
        let descriptor = descriptor();
        let validated = descriptor.validate_args(&HashMap::new()).unwrap();
        assert_eq!(validated.get("license"), Some(&"MIT".to_string()));
    }

    #[test]
    fn year_falls_back_to_current_year_when_omitted() {
        let descriptor = descriptor();
        let validated = descriptor.validate_args(&HashMap::new()).unwrap();
        let command = descriptor.execution_string(&validated);
        let current_year = chrono::Utc::now().format("%Y").to_string();
        assert!(command.contains(&current_year), "expected {current_year} in: {command}");
    }
}
