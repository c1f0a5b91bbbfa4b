use crate::registry::CommandDescriptor;
use crate::types::{ContainerRecipe, EventKind, ValidatedArgs};

const DOCUMENTATION: &str = "\
A no-op smoke test. Writes nothing to the working tree; used to verify the
pipeline end-to-end without risking a real mutation.
";

fn accepts(_kind: EventKind) -> bool {
    true
}

fn build(_args: &ValidatedArgs) -> String {
    "echo hello from repopal".into()
}

pub fn descriptor() -> CommandDescriptor {
    CommandDescriptor {
        name: "hello_world".into(),
        description: "Smoke-test command that never mutates the working tree".into(),
        documentation: DOCUMENTATION.into(),
        schema: vec![],
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
    fn build_ignores_any_supplied_arguments() {
        let descriptor = descriptor();
        let validated = descriptor.validate_args(&HashMap::new()).unwrap();
        assert_eq!(descriptor.execution_string(&validated), "echo hello from repopal");
    }
}
