//! Local digest of a finished call analysis: how complex the recorded IVR
//! flowchart is and which menu options the transcript announced.

use std::{collections::HashSet, fmt};

use regex::Regex;
use shared::protocol::CallAnalysis;

const COMPLEXITY_LEVELS: [&str; 5] = [
    "Very Simple",
    "Simple",
    "Moderate",
    "Complex",
    "Very Complex",
];

const MENU_PATTERNS: [&str; 5] = [
    r"(?:press|select|choose|dial|enter)\s+(\d+)(?:\s+for\s+|\s+to\s+)(.*?)(?:\.|$)",
    r"(?:press|select|choose|dial|enter)\s+(\d+)(?:\.|$)",
    r"(?:if you|for|to)\s+(.*?)(?:,\s*press\s+(\d+))",
    r"(?:option|number)\s+(\d+)(?:\s+for\s+|\s+to\s+)(.*?)(?:\.|$)",
    r"(\d+)(?:\s+for\s+|\s+to\s+)(.*?)(?:\.|$)",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowNode {
    pub id: String,
    pub text: String,
}

/// Nodes and edges pulled out of a Mermaid flowchart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flowchart {
    pub nodes: Vec<FlowNode>,
    pub connections: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComplexityMetrics {
    pub total_nodes: usize,
    pub decision_points: usize,
    pub total_connections: usize,
    pub estimated_depth: usize,
    pub cyclomatic_complexity: i64,
    /// 1 (very simple) to 5 (very complex).
    pub rating: u8,
}

impl Flowchart {
    pub fn complexity(&self) -> ComplexityMetrics {
        let total_nodes = self.nodes.len();
        let total_connections = self.connections.len();
        // Every edge is treated as a branch out of a decision.
        let decision_points = total_connections;

        let max_indent = self
            .nodes
            .iter()
            .map(|node| node.text.chars().count() - node.text.trim_start().chars().count())
            .max()
            .unwrap_or(0);
        let estimated_depth = (max_indent / 2).max(1);

        ComplexityMetrics {
            total_nodes,
            decision_points,
            total_connections,
            estimated_depth,
            cyclomatic_complexity: total_connections as i64 - total_nodes as i64 + 2,
            rating: rate_complexity(total_nodes, decision_points, estimated_depth),
        }
    }
}

pub fn rate_complexity(nodes: usize, decisions: usize, depth: usize) -> u8 {
    fn bucket(value: usize, bounds: [usize; 4]) -> u8 {
        bounds
            .iter()
            .position(|bound| value < *bound)
            .map_or(5, |idx| idx as u8 + 1)
    }

    let score = bucket(nodes, [5, 10, 15, 20])
        + bucket(decisions, [2, 4, 6, 8])
        + bucket(depth, [2, 3, 4, 5]);
    // Nearest integer of score / 3; a third never lands on .5.
    (score + 1) / 3
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuOption {
    pub number: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuMetrics {
    /// Runs of consecutive sentences announcing options.
    pub menus: Vec<Vec<MenuOption>>,
    pub total_options_mentioned: usize,
    pub unique_options: usize,
    pub average_menu_size: f64,
    pub max_menu_size: usize,
}

impl MenuMetrics {
    fn from_menus(menus: Vec<Vec<MenuOption>>) -> Self {
        let sizes: Vec<usize> = menus.iter().map(Vec::len).collect();
        let total_options_mentioned = sizes.iter().sum();
        let unique_options = menus
            .iter()
            .flatten()
            .map(|option| option.number.as_str())
            .collect::<HashSet<_>>()
            .len();
        let average_menu_size = if sizes.is_empty() {
            0.0
        } else {
            total_options_mentioned as f64 / sizes.len() as f64
        };

        Self {
            max_menu_size: sizes.iter().copied().max().unwrap_or(0),
            menus,
            total_options_mentioned,
            unique_options,
            average_menu_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsightsSummary {
    pub complexity: ComplexityMetrics,
    pub menus: MenuMetrics,
}

impl InsightsSummary {
    pub fn complexity_level(&self) -> &'static str {
        usize::from(self.complexity.rating)
            .checked_sub(1)
            .and_then(|idx| COMPLEXITY_LEVELS.get(idx))
            .copied()
            .unwrap_or("Moderate")
    }

    pub fn average_options_per_menu(&self) -> f64 {
        (self.menus.average_menu_size * 10.0).round() / 10.0
    }
}

impl fmt::Display for InsightsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IVR complexity: {}", self.complexity_level())?;
        writeln!(
            f,
            "Interaction points: {}",
            self.complexity.total_nodes
        )?;
        writeln!(
            f,
            "Menus: {} (avg {:.1} options, max depth {})",
            self.menus.menus.len(),
            self.average_options_per_menu(),
            self.complexity.estimated_depth
        )?;
        for option in self.menus.menus.iter().flatten() {
            writeln!(f, "  {}: {}", option.number, option.description)?;
        }
        Ok(())
    }
}

/// Compiled patterns for summarizing analyses. Build once and reuse.
pub struct InsightsAnalyzer {
    node_re: Regex,
    connection_re: Regex,
    menu_res: Vec<Regex>,
}

impl InsightsAnalyzer {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            node_re: Regex::new(r"(\w+)\s*\[(.*?)\]")?,
            connection_re: Regex::new(r"(\w+)\s*-->\s*(\w+)")?,
            menu_res: MENU_PATTERNS
                .iter()
                .map(|pattern| Regex::new(pattern))
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn parse_flowchart(&self, source: &str) -> Flowchart {
        let nodes = self
            .node_re
            .captures_iter(source)
            .map(|caps| FlowNode {
                id: caps[1].to_string(),
                text: caps[2].trim_matches('"').to_string(),
            })
            .collect();
        let connections = self
            .connection_re
            .captures_iter(source)
            .map(|caps| (caps[1].to_string(), caps[2].to_string()))
            .collect();
        Flowchart { nodes, connections }
    }

    fn menu_option(&self, sentence: &str) -> Option<MenuOption> {
        let lowered = sentence.to_lowercase();
        let caps = self.menu_res.iter().find_map(|re| re.captures(&lowered))?;

        let first = caps.get(1).map_or("", |m| m.as_str());
        let (number, description) = match caps.get(2) {
            Some(second) if !first.is_empty() && first.chars().all(|c| c.is_ascii_digit()) => {
                (first.to_string(), second.as_str().to_string())
            }
            Some(second) => (second.as_str().to_string(), first.to_string()),
            None => {
                let spoken = format!("press {first}");
                (first.to_string(), lowered.replace(&spoken, ""))
            }
        };

        Some(MenuOption {
            number,
            description: description.trim().to_string(),
        })
    }

    pub fn menu_metrics(&self, transcript: &str) -> MenuMetrics {
        let mut menus = Vec::new();
        let mut current = Vec::new();

        for sentence in transcript.split('.').map(str::trim).filter(|s| !s.is_empty()) {
            match self.menu_option(sentence) {
                Some(option) => current.push(option),
                None if !current.is_empty() => menus.push(std::mem::take(&mut current)),
                None => {}
            }
        }
        if !current.is_empty() {
            menus.push(current);
        }

        MenuMetrics::from_menus(menus)
    }

    pub fn summarize(&self, analysis: &CallAnalysis) -> InsightsSummary {
        let flowchart = self.parse_flowchart(analysis.flowchart.as_deref().unwrap_or_default());
        InsightsSummary {
            complexity: flowchart.complexity(),
            menus: self.menu_metrics(analysis.transcript.as_deref().unwrap_or_default()),
        }
    }
}
