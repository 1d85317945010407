// Tool to role mapping
//
// Pure lookups from an upstream tool name to the role and skills of the
// worker agent spawned for it. Unknown tools fall back to a generic worker.

use super::agent::AgentRole;

/// Skill set given to workers spawned by unrecognized tools
pub const GENERAL_SKILLS: &[&str] = &["general"];

/// Role and skills a tool confers on the agent spawned for it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolProfile {
    pub role: AgentRole,
    pub skills: &'static [&'static str],
}

impl ToolProfile {
    /// Looks up the profile for a tool name
    ///
    /// # Example
    /// ```
    /// use office_bridge::domain::agent::AgentRole;
    /// use office_bridge::domain::tools::ToolProfile;
    ///
    /// let profile = ToolProfile::for_tool("Grep");
    /// assert_eq!(profile.role, AgentRole::Searcher);
    /// assert_eq!(profile.skills, &["text-search", "regex"]);
    /// ```
    pub fn for_tool(tool: &str) -> Self {
        Self {
            role: role_for_tool(tool),
            skills: skills_for_tool(tool),
        }
    }

    /// Owned copy of the skill tags
    pub fn skill_tags(&self) -> Vec<String> {
        self.skills.iter().map(|skill| skill.to_string()).collect()
    }
}

/// Maps a tool name to the role of the agent that runs it
pub fn role_for_tool(tool: &str) -> AgentRole {
    match tool {
        "bash" | "Bash" => AgentRole::Developer,
        "Read" | "WebFetch" | "WebSearch" => AgentRole::Researcher,
        "Write" => AgentRole::Writer,
        "Edit" | "MultiEdit" => AgentRole::Editor,
        "Glob" => AgentRole::Finder,
        "Grep" => AgentRole::Searcher,
        "LS" => AgentRole::Organizer,
        "TodoRead" | "TodoWrite" => AgentRole::Planner,
        _ => AgentRole::Worker,
    }
}

/// Maps a tool name to the skill tags of the agent that runs it
///
/// Never empty.
pub fn skills_for_tool(tool: &str) -> &'static [&'static str] {
    match tool {
        "bash" | "Bash" => &["shell", "scripting", "automation"],
        "Read" => &["file-reading", "analysis"],
        "Write" => &["file-creation", "coding"],
        "Edit" | "MultiEdit" => &["refactoring", "bug-fixing"],
        "Glob" => &["pattern-matching", "file-search"],
        "Grep" => &["text-search", "regex"],
        "WebFetch" => &["web-scraping", "data-fetching"],
        "WebSearch" => &["research", "information-gathering"],
        _ => GENERAL_SKILLS,
    }
}
