use anyhow::Result;

use crate::cli::{Cli, LookupArgs};
use crate::store::source::{BlobSource, HttpSource};
use crate::store::{Buildings, Region, default_cache_dir};

pub fn run(cli: &Cli, args: &LookupArgs) -> Result<()> {
    let cache_dir = args.cache_dir.clone().unwrap_or_else(default_cache_dir);
    let region = Region::with_country(&args.country, &args.state, &args.county);

    let http;
    let source: Option<&dyn BlobSource> = if args.offline {
        None
    } else {
        http = HttpSource::new(&args.bucket)?;
        Some(&http)
    };

    if cli.verbose > 0 {
        eprintln!(
            "[lookup] {} {} from {}",
            region.state,
            region.county,
            cache_dir.display()
        );
    }
    let buildings = Buildings::open(region, &cache_dir, source)?;

    if let Some(name) = &args.field {
        println!("{}", buildings.field(&args.id, name)?);
        return Ok(());
    }

    let record = buildings.record(&args.id)?;
    let centroid = buildings.get_centroid(&args.id)?;
    let footprint = buildings.get_footprint(&args.id)?;

    println!("id:          {}", record.id);
    println!("climate:     {}", record.climate);
    println!("year:        {}", record.year);
    println!("class:       {}", buildings.get_class(&args.id)?);
    println!("code:        {}", buildings.get_code(&args.id)?);
    println!("type:        {}", buildings.get_type(&args.id)?);
    println!("mixed:       {}", record.mixed);
    println!("height:      {}", record.height);
    println!("floors:      {}", record.floors);
    println!("ground_area: {}", record.ground_area);
    println!("floor_area:  {}", record.floor_area);
    println!("windows:     {}", record.windows);
    println!("centroid:    ({:.5}, {:.5})", centroid.y(), centroid.x());
    for (n, vertex) in footprint.0.iter().enumerate() {
        println!("vertex {n}:    ({:.5}, {:.5})", vertex.y, vertex.x);
    }
    Ok(())
}
