use alpha::{Operand, Program};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One line of a program listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub index: usize,
    /// Canonical source form of the instruction
    pub source: String,
    pub opcode: String,
    pub operand: Option<String>,
    /// Resolved index for tag references
    pub target: Option<usize>,
    pub breakpoint: bool,
}

/// Human and machine readable view of an assembled program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramListing {
    pub instructions: Vec<ListingEntry>,
    pub tags: BTreeMap<String, usize>,
}

impl ProgramListing {
    pub fn from_program(program: &Program) -> Self {
        let instructions = program
            .instructions()
            .iter()
            .enumerate()
            .map(|(index, instruction)| ListingEntry {
                index,
                source: instruction.to_string(),
                opcode: instruction.opcode.to_string(),
                operand: instruction.operand.as_ref().map(|operand| operand.to_string()),
                target: match &instruction.operand {
                    Some(Operand::Tag { target, .. }) => Some(*target),
                    _ => None,
                },
                breakpoint: instruction.breakpoint,
            })
            .collect();

        let tags = program
            .tags()
            .iter()
            .map(|(name, index)| (name.clone(), *index))
            .collect();

        Self { instructions, tags }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Source text that assembles back to the same program
    pub fn to_source(&self) -> String {
        self.instructions
            .iter()
            .map(|entry| entry.source.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render with a marker on the instruction at `pc`
    pub fn render_with_marker(&self, pc: usize) -> String {
        let mut out = String::new();
        for entry in &self.instructions {
            let marker = if entry.index == pc { "=>" } else { "  " };
            out.push_str(&format!("{} {}\n", marker, Self::format_entry(entry)));
        }
        if pc >= self.instructions.len() {
            out.push_str("=> <end>\n");
        }
        out
    }

    fn format_entry(entry: &ListingEntry) -> String {
        match entry.target {
            Some(target) => format!("{:>4}  {:<16} -> {}", entry.index, entry.source, target),
            None => format!("{:>4}  {}", entry.index, entry.source),
        }
    }
}

impl fmt::Display for ProgramListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.instructions {
            writeln!(f, "{}", Self::format_entry(entry))?;
        }
        Ok(())
    }
}
