use crate::cli::RegionsArgs;
use crate::exit_codes;
use crate::output;
use fnirs_blocks::{region_slug, ChannelRegionMap, RunReport};
use serde::Serialize;

#[derive(Serialize)]
struct RegionInfo {
    region: String,
    slug: String,
    channels: Vec<String>,
}

fn collect(mapper: &ChannelRegionMap) -> Vec<RegionInfo> {
    mapper
        .all_regions()
        .into_iter()
        .map(|region| RegionInfo {
            region: region.to_string(),
            slug: region_slug(region),
            channels: mapper
                .channels_in(region)
                .iter()
                .map(|c| c.to_string())
                .collect(),
        })
        .collect()
}

pub fn execute(args: RegionsArgs) -> i32 {
    if !args.mapping.is_file() {
        eprintln!("Error: Mapping file not found: {}", args.mapping.display());
        return exit_codes::INPUT_ERROR;
    }

    let mut report = RunReport::new();
    let mapper = match ChannelRegionMap::load(Some(args.mapping.as_path()), &mut report) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    };

    let regions = collect(&mapper);

    if args.json {
        return output::print_json(&regions);
    }

    println!(
        "{} region(s), {} mapped channel(s):\n",
        regions.len(),
        mapper.len()
    );
    println!("  {:<24} {:<24} {:<8} {}", "Region", "Slug", "Count", "Channels");
    println!("  {}", "-".repeat(72));
    for r in &regions {
        println!(
            "  {:<24} {:<24} {:<8} {}",
            r.region,
            r.slug,
            r.channels.len(),
            r.channels.join(" ")
        );
    }

    for warning in report.warnings() {
        eprintln!("Warning: {}", warning);
    }

    exit_codes::SUCCESS
}
