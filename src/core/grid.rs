//! The fixed grid of tiles covering the viewport.
//!
//! The grid always has `ceil(width / tile_size) + 1` columns and
//! `ceil(height / tile_size) + 1` rows. Tiles are never created or destroyed
//! while panning: a tile that leaves the covered band on one side is moved
//! to the other side and its index shifted by a whole grid width/height.

use crate::{
    core::geo::{CacheKey, Point, TileIndex},
    layers::base::{LayerId, LayerStyle},
    prelude::HashMap,
    traits::TileContent,
};

/// Rendered content of one layer on one tile, tagged with the cache key it
/// was produced for so late arrivals can be matched.
#[derive(Debug, Clone, PartialEq)]
pub struct TileSlot<C> {
    pub key: CacheKey,
    pub content: C,
}

/// One cell of the grid.
#[derive(Debug, Clone)]
pub struct Tile<C> {
    /// Index in the unbounded tile grid at the current zoom level.
    pub index: TileIndex,
    /// Top-left pixel offset within the viewport.
    pub position: Point,
    /// Column/row this tile was allocated at. Only used for diagnostics.
    pub quadrant: (usize, usize),
    slots: HashMap<LayerId, TileSlot<C>>,
}

impl<C: TileContent> Tile<C> {
    pub fn new(column: usize, row: usize) -> Self {
        Self {
            index: TileIndex::new(column as i64, row as i64),
            position: Point::default(),
            quadrant: (column, row),
            slots: HashMap::default(),
        }
    }

    /// Attach (or replace) the content for one layer.
    pub fn attach(&mut self, layer: LayerId, key: CacheKey, content: C) {
        self.slots.insert(layer, TileSlot { key, content });
    }

    pub fn detach(&mut self, layer: LayerId) -> Option<TileSlot<C>> {
        self.slots.remove(&layer)
    }

    pub fn slot(&self, layer: LayerId) -> Option<&TileSlot<C>> {
        self.slots.get(&layer)
    }

    pub fn content(&self, layer: LayerId) -> Option<&C> {
        self.slots.get(&layer).map(|slot| &slot.content)
    }

    pub fn layer_count(&self) -> usize {
        self.slots.len()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    fn restyle(&mut self, layer: LayerId, style: &LayerStyle) {
        if let Some(slot) = self.slots.get_mut(&layer) {
            slot.content.apply_style(style);
        }
    }
}

/// Result of wrapping one coordinate of one tile into the covered band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AxisWrap {
    pub position: f64,
    pub index: i64,
    pub wrapped: bool,
}

/// Keep `position` inside the half-open band `[lower, lower + span)`.
///
/// Each whole span the tile moved out of the band shifts its index by
/// `count`. A tile exactly on the lower edge stays where it is.
pub(crate) fn wrap_axis(position: f64, index: i64, lower: f64, span: f64, count: i64) -> AxisWrap {
    let mut shifts = ((position - lower) / span).floor();
    let mut wrapped_position = position - shifts * span;

    // Guard against the division landing one step off due to rounding.
    if wrapped_position < lower {
        wrapped_position += span;
        shifts -= 1.0;
    } else if wrapped_position >= lower + span {
        wrapped_position -= span;
        shifts += 1.0;
    }
    // Far out zooms leave too few mantissa bits for a sub-span remainder.
    if !(lower..lower + span).contains(&wrapped_position) {
        wrapped_position = lower;
    }

    // `as` saturates, so the index arithmetic must saturate too.
    let shifts = shifts as i64;
    AxisWrap {
        position: wrapped_position,
        index: index.saturating_sub(shifts.saturating_mul(count)),
        wrapped: shifts != 0,
    }
}

/// Grid of tiles for one viewport size.
#[derive(Debug, Clone)]
pub struct TileGrid<C> {
    tile_size: f64,
    width: f64,
    height: f64,
    /// Tiles stored column-major: `columns[col][row]`.
    columns: Vec<Vec<Tile<C>>>,
}

impl<C: TileContent> TileGrid<C> {
    /// Allocate the grid for a viewport of `width` x `height` pixels.
    ///
    /// Tiles start at index `(col, row)` and pixel position zero; callers
    /// reposition right after building.
    pub fn build(tile_size: f64, width: f64, height: f64) -> Self {
        let cols = (width / tile_size).ceil().max(0.0) as usize + 1;
        let rows = (height / tile_size).ceil().max(0.0) as usize + 1;

        let columns = (0..cols)
            .map(|c| (0..rows).map(|r| Tile::new(c, r)).collect())
            .collect();

        log::debug!("built {}x{} tile grid for {}x{} viewport", cols, rows, width, height);

        Self {
            tile_size,
            width,
            height,
            columns,
        }
    }

    pub fn cols(&self) -> usize {
        self.columns.len()
    }

    pub fn rows(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    pub fn tile_size(&self) -> f64 {
        self.tile_size
    }

    pub fn dimensions(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    /// Total width covered by all columns, in pixels.
    pub fn span_x(&self) -> f64 {
        self.cols() as f64 * self.tile_size
    }

    /// Total height covered by all rows, in pixels.
    pub fn span_y(&self) -> f64 {
        self.rows() as f64 * self.tile_size
    }

    /// Lowest allowed pixel position of a tile. A tile further left (or up)
    /// lies entirely outside the viewport.
    pub fn lower_bound(&self) -> f64 {
        -self.tile_size
    }

    /// Recompute every tile's pixel position for the given pan position and
    /// in-flight motion, wrapping tiles that left the covered band.
    ///
    /// Returns the `(col, row)` of every tile whose index changed. Horizontal
    /// and vertical wrapping are applied independently.
    pub fn reposition(&mut self, pan: Point, motion: Point, full_size: f64) -> Vec<(usize, usize)> {
        let tile_size = self.tile_size;
        let lower = self.lower_bound();
        let span_x = self.span_x();
        let span_y = self.span_y();
        let cols = self.cols() as i64;
        let rows = self.rows() as i64;

        let mut wrapped = Vec::new();
        for (c, column) in self.columns.iter_mut().enumerate() {
            for (r, tile) in column.iter_mut().enumerate() {
                let x = tile.index.x as f64 * tile_size + pan.x + motion.x - full_size / 2.0;
                let y = tile.index.y as f64 * tile_size + pan.y + motion.y - full_size / 2.0;

                let wx = wrap_axis(x, tile.index.x, lower, span_x, cols);
                let wy = wrap_axis(y, tile.index.y, lower, span_y, rows);

                tile.index = TileIndex::new(wx.index, wy.index);
                tile.position = Point::new(wx.position, wy.position);

                if wx.wrapped || wy.wrapped {
                    log::trace!("tile #{},{} wrapped to {}", c, r, tile.index);
                    wrapped.push((c, r));
                }
            }
        }
        wrapped
    }

    pub fn tile(&self, col: usize, row: usize) -> Option<&Tile<C>> {
        self.columns.get(col).and_then(|column| column.get(row))
    }

    pub fn tile_mut(&mut self, col: usize, row: usize) -> Option<&mut Tile<C>> {
        self.columns.get_mut(col).and_then(|column| column.get_mut(row))
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile<C>> {
        self.columns.iter().flatten()
    }

    pub fn tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile<C>> {
        self.columns.iter_mut().flatten()
    }

    /// Find the tile currently showing `index`, if any.
    pub fn find(&self, index: TileIndex) -> Option<&Tile<C>> {
        self.tiles().find(|tile| tile.index == index)
    }

    /// Apply a layer's display style to its content on every tile.
    pub fn restyle_layer(&mut self, layer: LayerId, style: &LayerStyle) {
        for tile in self.tiles_mut() {
            tile.restyle(layer, style);
        }
    }

    /// Remove a layer's content from every tile.
    pub fn detach_layer(&mut self, layer: LayerId) {
        for tile in self.tiles_mut() {
            tile.detach(layer);
        }
    }

    /// Swap `content` into every tile whose slot for `layer` was produced for
    /// `key`. Returns how many tiles were updated.
    pub fn splice(&mut self, layer: LayerId, key: CacheKey, content: &C) -> usize {
        let mut count = 0;
        for tile in self.tiles_mut() {
            if let Some(slot) = tile.slots.get_mut(&layer) {
                if slot.key == key {
                    slot.content = content.clone();
                    count += 1;
                }
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::content::DisplayTile;

    const TS: f64 = 256.0;

    fn positions(grid: &TileGrid<DisplayTile>) -> Vec<(TileIndex, Point)> {
        grid.tiles().map(|t| (t.index, t.position)).collect()
    }

    #[test]
    fn test_grid_dimensions_have_one_tile_of_slack() {
        let grid: TileGrid<DisplayTile> = TileGrid::build(TS, 1000.0, 512.0);
        assert_eq!(grid.cols(), 5);
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.span_x(), 5.0 * TS);
        assert_eq!(grid.tile(4, 2).unwrap().index, TileIndex::new(4, 2));
        assert_eq!(grid.tile(4, 2).unwrap().quadrant, (4, 2));
    }

    #[test]
    fn test_wrap_axis_tie_stays() {
        let w = wrap_axis(-256.0, 3, -256.0, 768.0, 3);
        assert_eq!(w, AxisWrap { position: -256.0, index: 3, wrapped: false });

        let w = wrap_axis(512.0, 3, -256.0, 768.0, 3);
        assert_eq!(w, AxisWrap { position: -256.0, index: 0, wrapped: true });

        let w = wrap_axis(-257.0, 3, -256.0, 768.0, 3);
        assert_eq!(w, AxisWrap { position: 511.0, index: 6, wrapped: true });
    }

    #[test]
    fn test_wrap_axis_multiple_spans() {
        let w = wrap_axis(-3840.0, 0, -256.0, 768.0, 3);
        assert_eq!(w.index, 15);
        assert_eq!(w.position, 0.0);
    }

    #[test]
    fn test_wrap_axis_saturates_on_huge_offsets() {
        let w = wrap_axis(-1.5e23, 0, -256.0, 768.0, 3);
        assert!(w.position >= -256.0 && w.position < 512.0);
        assert_eq!(w.index, i64::MAX);
        assert!(w.wrapped);

        let w = wrap_axis(1.5e23, 5, -256.0, 768.0, 3);
        assert_eq!(w.index, 5 - i64::MAX);
    }

    #[test]
    fn test_initial_reposition_centers_image() {
        // 400px viewport, zoom 5: pan starts at the viewport center.
        let mut grid: TileGrid<DisplayTile> = TileGrid::build(TS, 400.0, 400.0);
        let full_size = TS * 32.0;
        grid.reposition(Point::new(200.0, 200.0), Point::default(), full_size);

        let mut xs: Vec<_> = grid.tiles().map(|t| (t.index.x, t.position.x)).collect();
        xs.sort_by_key(|(i, _)| *i);
        xs.dedup();
        assert_eq!(xs, vec![(15, -56.0), (16, 200.0), (17, 456.0 - 768.0 + 768.0)]);
    }

    #[test]
    fn test_full_wrap_plus_remainder_shifts_indices_by_grid_width() {
        let mut grid: TileGrid<DisplayTile> = TileGrid::build(TS, 400.0, 400.0);
        let full_size = TS * 32.0;
        let pan = Point::new(200.0, 200.0);
        grid.reposition(pan, Point::default(), full_size);
        let before = positions(&grid);

        // Camera moves right by one grid width plus 3px: content moves left.
        let motion = Point::new(-(TS * grid.cols() as f64 + 3.0), 0.0);
        let wrapped = grid.reposition(pan, motion, full_size);
        let after = positions(&grid);

        assert_eq!(wrapped.len(), 9);
        for ((bi, bp), (ai, ap)) in before.iter().zip(after.iter()) {
            assert_eq!(ai.x, bi.x + 3);
            assert_eq!(ai.y, bi.y);
            assert_eq!(ap.x, bp.x - 3.0);
            assert_eq!(ap.y, bp.y);
        }
    }

    #[test]
    fn test_position_only_motion_without_wrap() {
        let mut grid: TileGrid<DisplayTile> = TileGrid::build(TS, 400.0, 400.0);
        let full_size = TS * 32.0;
        let pan = Point::new(200.0, 200.0);
        grid.reposition(pan, Point::default(), full_size);
        let wrapped = grid.reposition(pan, Point::new(10.0, -10.0), full_size);
        assert!(wrapped.is_empty());
    }

    #[test]
    fn test_splice_only_matching_keys() {
        let mut grid: TileGrid<DisplayTile> = TileGrid::build(TS, 256.0, 256.0);
        let layer = LayerId(1);
        let k1 = CacheKey::new(0, 0, 0);
        let k2 = CacheKey::new(0, 1, 0);
        grid.tile_mut(0, 0).unwrap().attach(layer, k1, DisplayTile::empty(k1));
        grid.tile_mut(1, 0).unwrap().attach(layer, k2, DisplayTile::empty(k2));

        let replacement = DisplayTile::unavailable(k1);
        assert_eq!(grid.splice(layer, k1, &replacement), 1);
        assert_eq!(grid.tile(0, 0).unwrap().content(layer), Some(&replacement));
        assert_eq!(grid.tile(1, 0).unwrap().content(layer), Some(&DisplayTile::empty(k2)));

        grid.detach_layer(layer);
        assert!(grid.tiles().all(|t| t.layer_count() == 0));
    }
}
