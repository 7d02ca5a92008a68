//! Quick-look PNG rasters of the joined geometry, one per coordinate system.

use crate::config::AppConfig;
use crate::crs::{reproject, Crs};
use crate::error::PipelineError;
use crate::types::DemoTable;
use anyhow::{Context, Result};
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::{Coord, MultiPolygon, Point, Rect};
use image::{ImageBuffer, Rgba, RgbaImage};
use rstar::{RTree, RTreeObject, AABB};
use std::fs;
use std::path::PathBuf;
use tracing::info;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const FILL: Rgba<u8> = Rgba([31, 119, 180, 255]);
const EDGE: Rgba<u8> = Rgba([16, 60, 92, 255]);
/// Upper bound for either side of a preview in pixels.
const MAX_SIDE: u32 = 8192;

struct UnitIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for UnitIndex {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Renders the table in WGS84 and in the equal-area projection.
pub fn write_previews(config: &AppConfig, table: &DemoTable) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(&config.output.dir)
        .with_context(|| format!("Failed to create output directory: {:?}", config.output.dir))?;

    let mut written = Vec::new();
    for crs in [Crs::WGS84, Crs::EQUAL_AREA] {
        let geometries: Vec<MultiPolygon<f64>> = table
            .rows
            .iter()
            .map(|row| reproject(&row.geometry, table.crs, crs))
            .collect();

        let img = rasterize(&geometries, config.output.preview_width, crs == Crs::Geographic)
            .ok_or_else(|| PipelineError::EmptyTable("geometry for the preview".to_string()))?;

        let path = config
            .output
            .dir
            .join(format!("preview_epsg{}.png", crs.epsg()));
        img.save(&path)
            .with_context(|| format!("Failed to save preview: {:?}", path))?;
        info!("Wrote {:?} ({}x{})", path, img.width(), img.height());
        written.push(path);
    }

    Ok(written)
}

/// Fills every polygon by pixel-centre containment and darkens the borders
/// between differently owned pixels. Geographic input is stretched
/// vertically by `1/cos(latitude)` so shapes are not squashed.
pub fn rasterize(
    geometries: &[MultiPolygon<f64>],
    width: u32,
    geographic: bool,
) -> Option<RgbaImage> {
    let bounds = geometries
        .iter()
        .filter_map(|g| g.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            )
        })?;

    let dx = bounds.width();
    let dy = bounds.height();
    if dx <= 0.0 || dy <= 0.0 || width == 0 {
        return None;
    }
    let width = width.min(MAX_SIDE);

    let stretch = if geographic {
        1.0 / bounds.center().y.to_radians().cos()
    } else {
        1.0
    };
    let height = ((width as f64) * dy * stretch / dx)
        .round()
        .clamp(1.0, MAX_SIDE as f64) as u32;

    let tree = RTree::bulk_load(
        geometries
            .iter()
            .enumerate()
            .filter_map(|(index, g)| {
                g.bounding_rect().map(|rect| UnitIndex {
                    index,
                    aabb: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect(),
    );

    let mut owners: Vec<Option<usize>> = Vec::with_capacity(width as usize * height as usize);
    for py in 0..height {
        let y = bounds.max().y - (py as f64 + 0.5) / height as f64 * dy;
        for px in 0..width {
            let x = bounds.min().x + (px as f64 + 0.5) / width as f64 * dx;
            let point = Point::new(x, y);
            let owner = tree
                .locate_in_envelope_intersecting(&AABB::from_point([x, y]))
                .find(|candidate| geometries[candidate.index].contains(&point))
                .map(|candidate| candidate.index);
            owners.push(owner);
        }
    }

    let at = |px: u32, py: u32| owners[py as usize * width as usize + px as usize];
    let mut img: RgbaImage = ImageBuffer::from_pixel(width, height, BACKGROUND);
    for py in 0..height {
        for px in 0..width {
            let Some(owner) = at(px, py) else { continue };
            let border = (px + 1 < width && at(px + 1, py) != Some(owner))
                || (py + 1 < height && at(px, py + 1) != Some(owner))
                || (px > 0 && at(px - 1, py) != Some(owner))
                || (py > 0 && at(px, py - 1) != Some(owner));
            img.put_pixel(px, py, if border { EDGE } else { FILL });
        }
    }

    Some(img)
}
