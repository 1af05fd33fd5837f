//! A small deterministic host simulation.
//!
//! `SimWorld` is a grid map built from ASCII rows (`#` land, `~` water)
//! with connected-component regions, straight-line movement that stops at
//! impassable cells, garrisoning within range, unloading onto the nearest
//! land cell and a per-player ship training queue. It implements [`Host`]
//! so the naval manager can be driven end to end without a game engine.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::world::{
    Accessibility, Activity, Destroyed, EntityId, EntityInfo, EntityKind, Events, FishResource,
    Host, OwnershipChanged, PlayerId, Position, RegionId, Roles, ShipTemplate,
};

/// Distance at which a unit ordered to garrison climbs aboard.
pub const GARRISON_RANGE: f32 = 12.0;
/// Ticks a queued ship takes to train.
pub const TRAIN_TICKS: u32 = 3;
/// How far (in cells) unloading looks for dry land.
const UNLOAD_SEARCH_CELLS: i32 = 4;

const SHIP_SPEED: f32 = 8.0;
const UNIT_SPEED: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cell {
    Land(RegionId),
    Water(RegionId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Order {
    None,
    MoveTo(Position),
    MoveToRange { target: Position, min: f32, max: f32 },
    Garrison(EntityId),
}

#[derive(Debug, Clone)]
struct SimEntity {
    info: EntityInfo,
    order: Order,
    speed: f32,
}

#[derive(Debug, Clone)]
struct QueuedShip {
    player: PlayerId,
    sea: RegionId,
    template: ShipTemplate,
    remaining: u32,
}

/// A command the naval subsystem issued, recorded for inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    MoveTo(EntityId, Position),
    MoveToRange(EntityId, Position, f32, f32),
    Garrison(EntityId, EntityId),
    UnloadAll(EntityId),
    Train(PlayerId, RegionId, String),
}

/// Grid-based host stand-in.
#[derive(Debug, Clone)]
pub struct SimWorld {
    width: usize,
    height: usize,
    cell_size: f32,
    cells: Vec<Cell>,
    links: BTreeMap<RegionId, BTreeSet<RegionId>>,
    land: Vec<RegionId>,
    sea: Vec<RegionId>,
    entities: BTreeMap<EntityId, SimEntity>,
    next_id: u32,
    allies: BTreeSet<(PlayerId, PlayerId)>,
    templates: Vec<ShipTemplate>,
    queue: Vec<QueuedShip>,
    fish: Vec<FishResource>,
    events: Events,
    /// Every command received, in order.
    pub commands: Vec<Command>,
}

impl SimWorld {
    /// Builds a world from ASCII rows. Row 0 is `z = 0`.
    ///
    /// # Panics
    /// Panics on ragged rows or characters other than `#` and `~`.
    pub fn from_ascii(rows: &[&str], cell_size: f32) -> Self {
        let height = rows.len();
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut water = Vec::with_capacity(width * height);
        for row in rows {
            assert_eq!(row.len(), width, "ragged map row");
            for c in row.chars() {
                match c {
                    '#' => water.push(false),
                    '~' => water.push(true),
                    other => panic!("unexpected map character '{}'", other),
                }
            }
        }

        let mut region_of: Vec<Option<RegionId>> = vec![None; width * height];
        let mut land = Vec::new();
        let mut sea = Vec::new();
        let mut next_region = 1u16;
        for start in 0..width * height {
            if region_of[start].is_some() {
                continue;
            }
            let region = RegionId(next_region);
            next_region += 1;
            if water[start] {
                sea.push(region);
            } else {
                land.push(region);
            }
            let mut queue = VecDeque::new();
            region_of[start] = Some(region);
            queue.push_back(start);
            while let Some(idx) = queue.pop_front() {
                for n in neighbours4(idx, width, height) {
                    if region_of[n].is_none() && water[n] == water[start] {
                        region_of[n] = Some(region);
                        queue.push_back(n);
                    }
                }
            }
        }

        let mut cells = Vec::with_capacity(width * height);
        for idx in 0..width * height {
            let region = region_of[idx].unwrap_or(RegionId(0));
            cells.push(if water[idx] { Cell::Water(region) } else { Cell::Land(region) });
        }

        let mut links: BTreeMap<RegionId, BTreeSet<RegionId>> = BTreeMap::new();
        for idx in 0..width * height {
            for n in neighbours4(idx, width, height) {
                if water[idx] != water[n] {
                    let a = region_of[idx].unwrap_or(RegionId(0));
                    let b = region_of[n].unwrap_or(RegionId(0));
                    links.entry(a).or_default().insert(b);
                    links.entry(b).or_default().insert(a);
                }
            }
        }

        SimWorld {
            width,
            height,
            cell_size,
            cells,
            links,
            land,
            sea,
            entities: BTreeMap::new(),
            next_id: 1,
            allies: BTreeSet::new(),
            templates: default_templates(),
            queue: Vec::new(),
            fish: Vec::new(),
            events: Events::default(),
            commands: Vec::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// World position of the centre of cell `(i, j)`.
    pub fn cell_center(&self, i: usize, j: usize) -> Position {
        Position::new((i as f32 + 0.5) * self.cell_size, (j as f32 + 0.5) * self.cell_size)
    }

    fn cell_index(&self, pos: Position) -> Option<usize> {
        if pos.x < 0.0 || pos.z < 0.0 {
            return None;
        }
        let i = (pos.x / self.cell_size) as usize;
        let j = (pos.z / self.cell_size) as usize;
        if i >= self.width || j >= self.height {
            return None;
        }
        Some(j * self.width + i)
    }

    fn cell(&self, pos: Position) -> Option<Cell> {
        self.cell_index(pos).map(|idx| self.cells[idx])
    }

    fn passable(&self, kind: EntityKind, pos: Position) -> bool {
        match (kind, self.cell(pos)) {
            (EntityKind::Ship, Some(Cell::Water(_))) => true,
            (EntityKind::Ship, _) => false,
            (_, Some(Cell::Land(_))) => true,
            _ => false,
        }
    }

    /// Replaces the trainable ship templates.
    pub fn set_templates(&mut self, templates: Vec<ShipTemplate>) {
        self.templates = templates;
    }

    pub fn set_allied(&mut self, a: PlayerId, b: PlayerId) {
        self.allies.insert((a, b));
        self.allies.insert((b, a));
    }

    fn spawn(&mut self, info: EntityInfo, speed: f32) -> EntityId {
        let id = info.id;
        self.entities.insert(id, SimEntity { info, order: Order::None, speed });
        id
    }

    fn next_entity_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Places a ship. Reported to the AI as a finished training.
    pub fn add_ship(&mut self, owner: PlayerId, pos: Position, roles: Roles, capacity: u32) -> EntityId {
        let id = self.next_entity_id();
        let info = EntityInfo {
            id,
            owner,
            kind: EntityKind::Ship,
            position: Some(pos),
            roles,
            garrison_max: capacity,
            garrisoned_in: None,
            can_garrison: false,
            is_siege: false,
            activity: Activity::Idle,
            foundation: false,
        };
        self.spawn(info, SHIP_SPEED);
        self.events.training_finished.push(id);
        id
    }

    /// Places a land unit.
    pub fn add_unit(&mut self, owner: PlayerId, pos: Position, siege: bool) -> EntityId {
        let id = self.next_entity_id();
        let info = EntityInfo {
            id,
            owner,
            kind: EntityKind::Unit,
            position: Some(pos),
            roles: Roles::NONE,
            garrison_max: 0,
            garrisoned_in: None,
            can_garrison: true,
            is_siege: siege,
            activity: Activity::Idle,
            foundation: false,
        };
        self.spawn(info, UNIT_SPEED);
        self.events.create.push(id);
        id
    }

    /// Places a building that cannot be garrisoned onto ships.
    pub fn add_structure(&mut self, owner: PlayerId, pos: Position) -> EntityId {
        let id = self.next_entity_id();
        let info = EntityInfo {
            id,
            owner,
            kind: EntityKind::Other,
            position: Some(pos),
            roles: Roles::NONE,
            garrison_max: 0,
            garrisoned_in: None,
            can_garrison: false,
            is_siege: false,
            activity: Activity::Idle,
            foundation: false,
        };
        self.spawn(info, 0.0);
        self.events.create.push(id);
        id
    }

    /// Places a finished dock on the shore cell at `pos`.
    pub fn add_dock(&mut self, owner: PlayerId, pos: Position) -> EntityId {
        let id = self.next_entity_id();
        let info = EntityInfo {
            id,
            owner,
            kind: EntityKind::Dock,
            position: Some(pos),
            roles: Roles::NONE,
            garrison_max: 0,
            garrisoned_in: None,
            can_garrison: false,
            is_siege: false,
            activity: Activity::Idle,
            foundation: false,
        };
        self.spawn(info, 0.0);
        self.events.create.push(id);
        id
    }

    pub fn add_fish(&mut self, pos: Position, amount: f32) -> EntityId {
        let id = self.next_entity_id();
        self.fish.push(FishResource { id, position: pos, amount });
        id
    }

    /// Overrides what an entity reports itself busy with.
    pub fn set_activity(&mut self, id: EntityId, activity: Activity) {
        if let Some(e) = self.entities.get_mut(&id) {
            e.info.activity = activity;
        }
    }

    /// Teleports an entity; garrisoned units are not moved.
    pub fn set_position(&mut self, id: EntityId, pos: Position) {
        if let Some(e) = self.entities.get_mut(&id) {
            e.info.position = Some(pos);
            e.info.garrisoned_in = None;
        }
    }

    /// Puts `unit` inside `ship` immediately.
    pub fn force_garrison(&mut self, unit: EntityId, ship: EntityId) {
        if let Some(e) = self.entities.get_mut(&unit) {
            e.info.position = None;
            e.info.garrisoned_in = Some(ship);
            e.order = Order::None;
            e.info.activity = Activity::Idle;
        }
    }

    /// Units currently inside `ship`.
    pub fn garrisoned(&self, ship: EntityId) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| e.info.garrisoned_in == Some(ship))
            .map(|e| e.info.id)
            .collect()
    }

    /// Removes an entity. Units inside a destroyed ship swim to land within
    /// reach or drown.
    pub fn kill(&mut self, id: EntityId) {
        let Some(e) = self.entities.remove(&id) else {
            return;
        };
        self.events.destroy.push(Destroyed { id, owner: e.info.owner, kind: e.info.kind });
        if e.info.kind != EntityKind::Ship {
            return;
        }
        let passengers = self.garrisoned(id);
        let wreck = e.info.position;
        for p in passengers {
            let landing = wreck.and_then(|w| self.nearest_land(w, UNLOAD_SEARCH_CELLS));
            match landing {
                Some(spot) => self.set_position(p, spot),
                None => self.kill(p),
            }
        }
    }

    /// Hands an entity to another player.
    pub fn set_owner(&mut self, id: EntityId, to: PlayerId) {
        if let Some(e) = self.entities.get_mut(&id) {
            let from = e.info.owner;
            e.info.owner = to;
            self.events.ownership_changed.push(OwnershipChanged { id, from, to });
        }
    }

    /// Drains the events accumulated since the last call.
    pub fn take_events(&mut self) -> Events {
        std::mem::take(&mut self.events)
    }

    fn nearest_land(&self, from: Position, radius_cells: i32) -> Option<Position> {
        self.nearest_cell(from, radius_cells, |c| matches!(c, Cell::Land(_)))
    }

    fn nearest_water(&self, from: Position, radius_cells: i32) -> Option<Position> {
        self.nearest_cell(from, radius_cells, |c| matches!(c, Cell::Water(_)))
    }

    fn nearest_cell(&self, from: Position, radius_cells: i32, want: impl Fn(Cell) -> bool) -> Option<Position> {
        let ci = (from.x / self.cell_size).floor() as i32;
        let cj = (from.z / self.cell_size).floor() as i32;
        let mut best: Option<(f32, Position)> = None;
        for dj in -radius_cells..=radius_cells {
            for di in -radius_cells..=radius_cells {
                let (i, j) = (ci + di, cj + dj);
                if i < 0 || j < 0 || i as usize >= self.width || j as usize >= self.height {
                    continue;
                }
                let (i, j) = (i as usize, j as usize);
                if !want(self.cells[j * self.width + i]) {
                    continue;
                }
                let center = self.cell_center(i, j);
                let d = center.square_distance(from);
                if best.map_or(true, |(bd, _)| d < bd) {
                    best = Some((d, center));
                }
            }
        }
        best.map(|(_, p)| p)
    }

    /// Sea region a dock at `pos` opens onto.
    fn dock_sea(&self, pos: Position) -> Option<RegionId> {
        self.nearest_water(pos, 1).and_then(|p| self.sea_region(p))
    }

    /// Advances the world by one tick: training, movement, boarding.
    pub fn step(&mut self) {
        self.step_training();
        let ids: Vec<EntityId> = self.entities.keys().copied().collect();
        for id in ids {
            self.step_entity(id);
        }
    }

    fn step_training(&mut self) {
        let mut finished = Vec::new();
        for (i, q) in self.queue.iter_mut().enumerate() {
            q.remaining = q.remaining.saturating_sub(1);
            if q.remaining == 0 {
                finished.push(i);
            }
        }
        for i in finished.into_iter().rev() {
            let q = self.queue.remove(i);
            let spot = self
                .entities
                .values()
                .filter(|e| e.info.is_dock() && e.info.owner == q.player)
                .filter_map(|e| e.info.position)
                .find(|p| self.dock_sea(*p) == Some(q.sea))
                .and_then(|p| self.nearest_water(p, 2));
            if let Some(spot) = spot {
                self.add_ship(q.player, spot, q.template.roles, q.template.garrison_max);
            }
        }
    }

    fn step_entity(&mut self, id: EntityId) {
        let Some(e) = self.entities.get(&id) else {
            return;
        };
        let Some(pos) = e.info.position else {
            return;
        };
        let kind = e.info.kind;
        let speed = e.speed;
        let order = e.order;
        match order {
            Order::None => {}
            Order::MoveTo(target) => {
                let arrived = self.advance(id, kind, pos, target, speed, 0.0);
                if arrived {
                    self.finish_order(id);
                }
            }
            Order::MoveToRange { target, min, max } => {
                let d = pos.square_distance(target).sqrt();
                if d >= min && d <= max {
                    self.finish_order(id);
                } else if d < min {
                    let (dx, dz) = if d > 0.0 {
                        ((pos.x - target.x) / d, (pos.z - target.z) / d)
                    } else {
                        (1.0, 0.0)
                    };
                    let away = Position::new(target.x + dx * min, target.z + dz * min);
                    if self.advance(id, kind, pos, away, speed, 0.0) {
                        self.finish_order(id);
                    }
                } else if self.advance(id, kind, pos, target, speed, max) {
                    self.finish_order(id);
                }
            }
            Order::Garrison(ship) => {
                let ship_info = self.entities.get(&ship).map(|s| (s.info.position, s.info.garrison_max));
                let Some((Some(ship_pos), capacity)) = ship_info else {
                    self.finish_order(id);
                    return;
                };
                if pos.square_distance(ship_pos) <= GARRISON_RANGE * GARRISON_RANGE {
                    if (self.garrisoned(ship).len() as u32) < capacity {
                        self.force_garrison(id, ship);
                    }
                    return;
                }
                self.advance(id, kind, pos, ship_pos, speed, 0.0);
            }
        }
    }

    /// Moves one step towards `target`, stopping at `stop_at` distance or at
    /// impassable terrain. A step into impassable terrain slides along one
    /// axis when that still gets closer. Returns true when the move is over.
    fn advance(&mut self, id: EntityId, kind: EntityKind, pos: Position, target: Position, speed: f32, stop_at: f32) -> bool {
        let d = pos.square_distance(target).sqrt();
        let remaining = d - stop_at;
        if remaining <= 0.0 {
            return true;
        }
        let step = speed.min(remaining);
        let straight = if d > 0.0 {
            Position::new(pos.x + (target.x - pos.x) / d * step, pos.z + (target.z - pos.z) / d * step)
        } else {
            target
        };
        let slides = [Position::new(straight.x, pos.z), Position::new(pos.x, straight.z)];
        let next = if self.passable(kind, straight) {
            straight
        } else {
            let closer = slides.into_iter().find(|p| {
                !p.same_spot(pos) && self.passable(kind, *p) && p.square_distance(target) < d * d
            });
            match closer {
                Some(p) => p,
                None => return true,
            }
        };
        if let Some(e) = self.entities.get_mut(&id) {
            e.info.position = Some(next);
        }
        step >= remaining
    }

    fn finish_order(&mut self, id: EntityId) {
        if let Some(e) = self.entities.get_mut(&id) {
            e.order = Order::None;
            e.info.activity = Activity::Idle;
        }
    }

    fn set_order(&mut self, id: EntityId, order: Order) {
        if let Some(e) = self.entities.get_mut(&id) {
            e.order = order;
            e.info.activity = Activity::Moving;
        }
    }
}

fn neighbours4(idx: usize, width: usize, height: usize) -> impl Iterator<Item = usize> {
    let i = idx % width;
    let j = idx / width;
    let mut out = Vec::with_capacity(4);
    if i > 0 {
        out.push(idx - 1);
    }
    if i + 1 < width {
        out.push(idx + 1);
    }
    if j > 0 {
        out.push(idx - width);
    }
    if j + 1 < height {
        out.push(idx + width);
    }
    out.into_iter()
}

/// The stock ship roster: a fishing boat, a merchant transport and an
/// armed transport.
pub fn default_templates() -> Vec<ShipTemplate> {
    use crate::world::Role;
    vec![
        ShipTemplate {
            name: "ship_fishing".to_string(),
            roles: Roles::of(&[Role::Fishing]),
            garrison_max: 0,
            arrows: 0,
            carries_siege: false,
            available: true,
        },
        ShipTemplate {
            name: "ship_merchant".to_string(),
            roles: Roles::of(&[Role::Transport]),
            garrison_max: 10,
            arrows: 0,
            carries_siege: false,
            available: true,
        },
        ShipTemplate {
            name: "ship_bireme".to_string(),
            roles: Roles::of(&[Role::Transport, Role::Warship]),
            garrison_max: 12,
            arrows: 2,
            carries_siege: false,
            available: true,
        },
    ]
}

impl Accessibility for SimWorld {
    fn land_region(&self, pos: Position) -> Option<RegionId> {
        match self.cell(pos)? {
            Cell::Land(r) => Some(r),
            Cell::Water(_) => None,
        }
    }

    fn sea_region(&self, pos: Position) -> Option<RegionId> {
        match self.cell(pos)? {
            Cell::Water(r) => Some(r),
            Cell::Land(_) => None,
        }
    }

    fn region_links(&self, region: RegionId) -> Vec<RegionId> {
        self.links
            .get(&region)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    fn in_bounds(&self, pos: Position) -> bool {
        self.cell_index(pos).is_some()
    }

    fn land_regions(&self) -> Vec<RegionId> {
        self.land.clone()
    }

    fn sea_regions(&self) -> Vec<RegionId> {
        self.sea.clone()
    }
}

impl Host for SimWorld {
    fn entity(&self, id: EntityId) -> Option<EntityInfo> {
        self.entities.get(&id).map(|e| e.info.clone())
    }

    fn entities_of(&self, player: PlayerId) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| e.info.owner == player)
            .map(|e| e.info.id)
            .collect()
    }

    fn docks(&self) -> Vec<EntityInfo> {
        self.entities
            .values()
            .filter(|e| e.info.is_dock())
            .map(|e| e.info.clone())
            .collect()
    }

    fn is_ally(&self, player: PlayerId, other: PlayerId) -> bool {
        player == other || self.allies.contains(&(player, other))
    }

    fn fish_resources(&self) -> Vec<FishResource> {
        self.fish.clone()
    }

    fn ship_templates(&self, player: PlayerId, sea: RegionId) -> Vec<ShipTemplate> {
        let has_dock = self
            .entities
            .values()
            .filter(|e| e.info.is_dock() && e.info.owner == player && !e.info.foundation)
            .filter_map(|e| e.info.position)
            .any(|p| self.dock_sea(p) == Some(sea));
        if has_dock {
            self.templates.clone()
        } else {
            Vec::new()
        }
    }

    fn queued_ships(&self, player: PlayerId, sea: Option<RegionId>) -> usize {
        self.queue
            .iter()
            .filter(|q| q.player == player && sea.map_or(true, |s| s == q.sea))
            .count()
    }

    fn move_to(&mut self, id: EntityId, target: Position) {
        self.commands.push(Command::MoveTo(id, target));
        self.set_order(id, Order::MoveTo(target));
    }

    fn move_to_range(&mut self, id: EntityId, target: Position, min_range: f32, max_range: f32) {
        self.commands.push(Command::MoveToRange(id, target, min_range, max_range));
        self.set_order(id, Order::MoveToRange { target, min: min_range, max: max_range });
    }

    fn garrison(&mut self, unit: EntityId, ship: EntityId) {
        self.commands.push(Command::Garrison(unit, ship));
        self.set_order(unit, Order::Garrison(ship));
    }

    fn unload_all(&mut self, ship: EntityId) {
        self.commands.push(Command::UnloadAll(ship));
        let Some(ship_pos) = self.entities.get(&ship).and_then(|s| s.info.position) else {
            return;
        };
        let Some(spot) = self.nearest_land(ship_pos, UNLOAD_SEARCH_CELLS) else {
            return;
        };
        for unit in self.garrisoned(ship) {
            self.set_position(unit, spot);
            self.finish_order(unit);
        }
    }

    fn train(&mut self, player: PlayerId, sea: RegionId, template: &str) -> bool {
        self.commands.push(Command::Train(player, sea, template.to_string()));
        let Some(t) = self.templates.iter().find(|t| t.name == template).cloned() else {
            return false;
        };
        if self.ship_templates(player, sea).is_empty() {
            return false;
        }
        self.queue.push(QueuedShip { player, sea, template: t, remaining: TRAIN_TICKS });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Role;

    const STRAIT: [&str; 4] = [
        "###~~~~###",
        "###~~~~###",
        "###~~~~###",
        "###~~~~###",
    ];

    #[test]
    fn regions_are_flood_filled() {
        let w = SimWorld::from_ascii(&STRAIT, 4.0);
        assert_eq!(w.land_regions().len(), 2);
        assert_eq!(w.sea_regions().len(), 1);
        let west = w.land_region(w.cell_center(0, 0)).unwrap();
        let east = w.land_region(w.cell_center(9, 3)).unwrap();
        let sea = w.sea_region(w.cell_center(5, 1)).unwrap();
        assert_ne!(west, east);
        assert!(w.regions_adjacent(west, sea));
        assert!(w.regions_adjacent(sea, east));
        assert!(!w.regions_adjacent(west, east));
    }

    #[test]
    fn out_of_bounds_has_no_region() {
        let w = SimWorld::from_ascii(&STRAIT, 4.0);
        assert!(w.land_region(Position::new(-1.0, 0.0)).is_none());
        assert!(w.sea_region(Position::new(1000.0, 0.0)).is_none());
        assert!(!w.in_bounds(Position::new(40.0, 0.0)));
    }

    #[test]
    fn ships_stop_at_the_shore() {
        let mut w = SimWorld::from_ascii(&STRAIT, 4.0);
        let ship = w.add_ship(PlayerId(1), w.cell_center(5, 1), Roles::of(&[Role::Transport]), 5);
        w.move_to(ship, w.cell_center(0, 1));
        for _ in 0..10 {
            w.step();
        }
        let pos = w.entity(ship).unwrap().position.unwrap();
        assert!(w.sea_region(pos).is_some());
        assert!(w.entity(ship).unwrap().is_idle());
    }

    #[test]
    fn units_board_and_unload() {
        let mut w = SimWorld::from_ascii(&STRAIT, 4.0);
        let ship = w.add_ship(PlayerId(1), w.cell_center(3, 1), Roles::of(&[Role::Transport]), 5);
        let unit = w.add_unit(PlayerId(1), w.cell_center(1, 1), false);
        w.garrison(unit, ship);
        for _ in 0..5 {
            w.step();
        }
        assert_eq!(w.entity(unit).unwrap().garrisoned_in, Some(ship));
        assert!(w.entity(unit).unwrap().position.is_none());
        w.unload_all(ship);
        let pos = w.entity(unit).unwrap().position.unwrap();
        assert!(w.land_region(pos).is_some());
    }

    #[test]
    fn killing_a_ship_at_sea_drowns_passengers() {
        let rows = ["#~~~~~~~~~~~~#"];
        let mut w = SimWorld::from_ascii(&rows, 4.0);
        let ship = w.add_ship(PlayerId(1), w.cell_center(7, 0), Roles::of(&[Role::Transport]), 5);
        let unit = w.add_unit(PlayerId(1), w.cell_center(0, 0), false);
        w.force_garrison(unit, ship);
        w.take_events();
        w.kill(ship);
        assert!(w.entity(unit).is_none());
        let events = w.take_events();
        assert_eq!(events.destroy.len(), 2);
    }

    #[test]
    fn training_spawns_a_ship() {
        let mut w = SimWorld::from_ascii(&STRAIT, 4.0);
        w.add_dock(PlayerId(1), w.cell_center(2, 1));
        let sea = w.sea_region(w.cell_center(4, 1)).unwrap();
        assert!(w.train(PlayerId(1), sea, "ship_merchant"));
        assert_eq!(w.queued_ships(PlayerId(1), Some(sea)), 1);
        w.take_events();
        for _ in 0..TRAIN_TICKS {
            w.step();
        }
        assert_eq!(w.queued_ships(PlayerId(1), None), 0);
        assert_eq!(w.take_events().training_finished.len(), 1);
    }

    #[test]
    fn training_without_dock_fails() {
        let mut w = SimWorld::from_ascii(&STRAIT, 4.0);
        let sea = w.sea_region(w.cell_center(4, 1)).unwrap();
        assert!(!w.train(PlayerId(1), sea, "ship_merchant"));
        assert!(!w.train(PlayerId(1), sea, "no_such_ship"));
    }
}
