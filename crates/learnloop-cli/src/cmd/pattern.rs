use super::Context;
use crate::output::{print_json, print_table, truncate};
use learnloop_core::store::Store;
use learnloop_core::types::PatternStatus;
use learnloop_core::LearnError;

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

pub fn list(ctx: &Context, status: Option<&str>) -> anyhow::Result<()> {
    let store = Store::load(&ctx.store)?;
    let wanted = status.map(PatternStatus::from);
    let patterns: Vec<_> = store
        .patterns
        .iter()
        .filter(|p| wanted.as_ref().map_or(true, |s| &p.status == s))
        .collect();

    if ctx.json {
        return print_json(&patterns);
    }
    if patterns.is_empty() {
        println!("no patterns");
        return Ok(());
    }
    print_table(
        &["ID", "SEVERITY", "OCC", "PROJECTS", "STATUS", "NAME"],
        patterns
            .iter()
            .map(|p| {
                vec![
                    p.pattern_id.clone(),
                    p.severity.to_string(),
                    p.occurrences.to_string(),
                    p.project_count().to_string(),
                    p.status.to_string(),
                    truncate(&p.name, 50),
                ]
            })
            .collect(),
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

pub fn show(ctx: &Context, pattern_id: &str) -> anyhow::Result<()> {
    let store = Store::load(&ctx.store)?;
    let p = store
        .get(pattern_id)
        .ok_or_else(|| LearnError::PatternNotFound(pattern_id.to_string()))?;

    if ctx.json {
        return print_json(p);
    }
    println!("ID:          {}", p.pattern_id);
    println!("Name:        {}", p.name);
    println!("Status:      {}", p.status);
    println!("Severity:    {}", p.severity);
    println!("Occurrences: {}", p.occurrences);
    println!("Projects:    {}", p.projects.join(", "));
    println!("Root cause:  {}", p.root_cause);
    println!("Solution:    {}", p.proposed_solution);
    println!("Discovered:  {} ({})", p.discovered_in, p.discovered_at);
    println!("Learnings:   {}", p.source_learnings.join(", "));
    for (key, value) in &p.extra {
        let rendered = serde_yaml::to_string(value)?;
        println!("{key}: {}", rendered.trim_end());
    }
    Ok(())
}
