use crate::app::{AppContext, Result, TributaryError};
use crate::domain::{ContentRef, Quality, SearchResult};

pub fn list_sites(ctx: &AppContext, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&ctx.sites.names())?);
        return Ok(());
    }
    for adapter in ctx.sites.iter() {
        let spec = adapter.spec();
        println!(
            "{:<12} {} [{}]",
            spec.name,
            spec.base_url,
            spec.kinds
                .iter()
                .map(|k| format!("{k:?}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(())
}

pub fn list_sections(ctx: &AppContext, site: &str, json: bool) -> Result<()> {
    let adapter = ctx.adapter(site)?;
    let labels: Vec<&str> = adapter
        .spec()
        .sections
        .iter()
        .map(|s| s.label.as_str())
        .collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&labels)?);
        return Ok(());
    }
    if labels.is_empty() {
        println!("{site} has no main-page sections");
        return Ok(());
    }
    for label in labels {
        println!("{label}");
    }
    Ok(())
}

pub async fn browse(
    ctx: &AppContext,
    site: &str,
    section: &str,
    page: u32,
    json: bool,
) -> Result<()> {
    let adapter = ctx.adapter(site)?;
    let section = adapter
        .spec()
        .section(section)
        .ok_or_else(|| {
            TributaryError::Config(format!("no section {section:?} on {site}"))
        })?
        .clone();
    let results = adapter
        .main_page(ctx.pipeline_context(), &section, page)
        .await?;
    print_results(&results, json)
}

pub async fn search(ctx: &AppContext, site: &str, query: &str, json: bool) -> Result<()> {
    let adapter = ctx.adapter(site)?;
    let results = adapter.search(ctx.pipeline_context(), query).await?;
    print_results(&results, json)
}

pub async fn show(ctx: &AppContext, site: &str, url: &str, json: bool) -> Result<()> {
    let adapter = ctx.adapter(site)?;
    let detail = adapter
        .load(ctx.pipeline_context(), &ContentRef::new(url))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    println!("{} [{:?}]", detail.title, detail.kind);
    if let Some(year) = detail.year {
        println!("Year:   {year}");
    }
    if let Some(status) = detail.status {
        println!("Status: {status:?}");
    }
    if !detail.tags.is_empty() {
        println!("Genre:  {}", detail.tags.join(", "));
    }
    if let Some(plot) = &detail.plot {
        println!("\n{plot}\n");
    }
    println!("{} playback target(s):", detail.episodes.len());
    for episode in &detail.episodes {
        match (episode.season, episode.episode) {
            (Some(season), Some(number)) => {
                println!("  S{season:02}E{number:02}  {}", episode.content.url)
            }
            (None, Some(number)) => println!("  E{number:02}  {}", episode.content.url),
            _ => println!("  {}  {}", episode.name, episode.content.url),
        }
    }
    Ok(())
}

pub async fn links(ctx: &AppContext, site: &str, url: &str, json: bool) -> Result<()> {
    let links = ctx.resolve_links(site, url).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&links.streams)?);
        return Ok(());
    }

    if links.is_empty() {
        println!("No sources found");
        return Ok(());
    }
    for stream in &links.streams {
        let quality = match stream.quality {
            Quality::Unknown => String::new(),
            q => format!(" [{}p]", q.rank()),
        };
        let manifest = if stream.is_manifest { " (hls)" } else { "" };
        println!("{}{quality}{manifest}", stream.label);
        println!("  {}", stream.url);
        if let Some(referer) = &stream.referer {
            println!("  referer: {referer}");
        }
    }
    for subtitle in &links.subtitles {
        println!("sub: {} {}", subtitle.language, subtitle.url);
    }
    Ok(())
}

fn print_results(results: &[SearchResult], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }
    if results.is_empty() {
        println!("No results");
        return Ok(());
    }
    for result in results {
        let badge = match (result.quality, result.latest_episode) {
            (Some(quality), _) => format!(" [{quality:?}]"),
            (None, Some(episode)) => format!(" [Eps {episode}]"),
            _ => String::new(),
        };
        println!("{}{badge}", result.title);
        println!("  {}", result.content.url);
    }
    Ok(())
}
