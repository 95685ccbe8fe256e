//! Flat text snapshot of the grid and registry.
//!
//! ```text
//! samooh-map,1
//! grid,<size>,<center_x>,<center_y>
//! robot,<id>,<index>,<x>,<y>,<theta>,<x_init>,<y_init>,<theta_init>
//! row,<iy>,<one char per cell>
//! ```
//!
//! Robot lines come in index order, one row line per grid row. Cells use
//! `?` (unknown), `.` (open) and `#` (obstacle). Pending registrations are
//! not saved.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::core::types::{CellState, MapPoint, RobotId, RobotPose};
use crate::error::{FusionError, Result};
use crate::grid::OccupancyGrid;
use crate::registry::RobotRegistry;

const MAP_MAGIC: &str = "samooh-map";
const MAP_VERSION: u32 = 1;

/// Save grid and registry to `path`, creating parent directories.
pub fn save_map(
    path: impl AsRef<Path>,
    grid: &OccupancyGrid,
    registry: &RobotRegistry,
) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    write_map(&mut writer, grid, registry)?;
    writer.flush()?;
    Ok(())
}

/// Write the snapshot to any sink.
pub fn write_map<W: Write>(
    writer: &mut W,
    grid: &OccupancyGrid,
    registry: &RobotRegistry,
) -> Result<()> {
    let size = grid.size();
    let (center_x, center_y) = grid.center();

    writeln!(writer, "{},{}", MAP_MAGIC, MAP_VERSION)?;
    writeln!(writer, "grid,{},{},{}", size, center_x, center_y)?;

    for (index, (id, pose)) in registry.entries().into_iter().enumerate() {
        let origin = pose.origin();
        writeln!(
            writer,
            "robot,{},{},{},{},{},{},{},{}",
            id,
            index,
            pose.position.x,
            pose.position.y,
            pose.heading,
            origin.x,
            origin.y,
            pose.origin_heading()
        )?;
    }

    let mut row = String::with_capacity(size);
    for (iy, cells) in grid.cells().chunks(size.max(1)).enumerate() {
        row.clear();
        row.extend(cells.iter().map(|c| c.as_char()));
        writeln!(writer, "row,{},{}", iy, row)?;
    }
    Ok(())
}

/// Load a snapshot written by [`save_map`].
pub fn load_map(path: impl AsRef<Path>) -> Result<(OccupancyGrid, RobotRegistry)> {
    let file = File::open(path.as_ref())?;
    read_map(BufReader::new(file))
}

/// Parse a snapshot from any buffered reader.
pub fn read_map<R: BufRead>(reader: R) -> Result<(OccupancyGrid, RobotRegistry)> {
    let mut lines = reader.lines().enumerate();

    let (_, first) = lines
        .next()
        .ok_or_else(|| FusionError::MapFile("empty map file".into()))?;
    let first = first?;
    if first != format!("{},{}", MAP_MAGIC, MAP_VERSION) {
        return Err(FusionError::MapFile(format!(
            "unsupported map header: {:?}",
            first
        )));
    }

    let mut dims: Option<(usize, usize, usize)> = None;
    let mut robots: Vec<(usize, RobotId, RobotPose)> = Vec::new();
    let mut rows: Vec<Option<Vec<CellState>>> = Vec::new();

    for (number, line) in lines {
        let line = line?;
        let line_no = number + 1;
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').collect();
        match fields[0] {
            "grid" => {
                if fields.len() != 4 {
                    return Err(malformed(line_no, "grid line needs 3 values"));
                }
                let size: usize = parse_field(fields[1], line_no)?;
                let center_x: usize = parse_field(fields[2], line_no)?;
                let center_y: usize = parse_field(fields[3], line_no)?;
                if size == 0 || center_x >= size || center_y >= size {
                    return Err(malformed(line_no, "invalid grid dimensions"));
                }
                dims = Some((size, center_x, center_y));
                rows = vec![None; size];
            }
            "robot" => {
                if fields.len() != 9 {
                    return Err(malformed(line_no, "robot line needs 8 values"));
                }
                let id: RobotId = parse_field(fields[1], line_no)?;
                let index: usize = parse_field(fields[2], line_no)?;
                let values: Vec<i32> = fields[3..]
                    .iter()
                    .map(|f| parse_field(f, line_no))
                    .collect::<Result<_>>()?;
                let pose = RobotPose::with_origin(
                    MapPoint::new(values[0], values[1]),
                    values[2],
                    MapPoint::new(values[3], values[4]),
                    values[5],
                );
                robots.push((index, id, pose));
            }
            "row" => {
                let (size, _, _) =
                    dims.ok_or_else(|| malformed(line_no, "row before grid line"))?;
                if fields.len() != 3 {
                    return Err(malformed(line_no, "row line needs 2 values"));
                }
                let iy: usize = parse_field(fields[1], line_no)?;
                if iy >= size {
                    return Err(malformed(line_no, "row index out of range"));
                }
                let cells: Vec<CellState> = fields[2]
                    .chars()
                    .map(|c| {
                        CellState::from_char(c)
                            .ok_or_else(|| malformed(line_no, &format!("invalid cell {:?}", c)))
                    })
                    .collect::<Result<_>>()?;
                if cells.len() != size {
                    return Err(malformed(line_no, "row length does not match grid size"));
                }
                rows[iy] = Some(cells);
            }
            other => {
                return Err(malformed(line_no, &format!("unknown record {:?}", other)));
            }
        }
    }

    let (size, center_x, center_y) =
        dims.ok_or_else(|| FusionError::MapFile("missing grid line".into()))?;

    let mut cells = Vec::with_capacity(size * size);
    for (iy, row) in rows.into_iter().enumerate() {
        let row = row.ok_or_else(|| FusionError::MapFile(format!("missing row {}", iy)))?;
        cells.extend(row);
    }
    let grid = OccupancyGrid::from_cells(size, center_x, center_y, cells)?;

    robots.sort_by_key(|&(index, _, _)| index);
    for (expected, &(index, id, _)) in robots.iter().enumerate() {
        if index != expected {
            return Err(FusionError::MapFile(format!(
                "robot {} has index {}, expected {}",
                id, index, expected
            )));
        }
    }
    let registry = RobotRegistry::from_poses(
        robots.into_iter().map(|(_, id, pose)| (id, pose)).collect(),
    )
    .map_err(|e| FusionError::MapFile(e.to_string()))?;

    Ok((grid, registry))
}

fn malformed(line_no: usize, what: &str) -> FusionError {
    FusionError::MapFile(format!("line {}: {}", line_no, what))
}

fn parse_field<T: std::str::FromStr>(field: &str, line_no: usize) -> Result<T> {
    field
        .trim()
        .parse()
        .map_err(|_| malformed(line_no, &format!("cannot parse {:?}", field)))
}
