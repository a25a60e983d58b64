use std::{
    fmt,
    io::{self, BufRead, Write},
    sync::Arc,
};

use clap::{value_t, App, Arg, ArgMatches};
use once_cell::sync::Lazy;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use regex::Regex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use seabattle::{
    board::{
        occupied_cells, CannotPlaceReason, Coordinate, FleetDraft, FleetSubmission, Orientation,
        ShipPose,
    },
    bot::RandomStrategy,
    game::{
        AbilityKind, AbilityRequest, Broadcast, CellView, Change, Effect, Intent, Phase, PlayerId,
        Update,
    },
    offline::LocalMatch,
    ships::{Ruleset, ShipIndex},
};

static PLACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?x)(?:place|put)\s+
        (?P<ship>\w+)\s+
        (?:(?:at|on|to|->|=>)\s+)?
        (?P<x>[0-9]+)(?:\s*,\s*|\s+)(?P<y>[0-9]+)\s+
        (?P<dir>\w+)$",
    )
    .unwrap()
});

static UNPLACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?x)(?:un-?place|remove)\s+
        (?P<ship>\w+)$",
    )
    .unwrap()
});

static FIRE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?x)(?:fire|shoot|f)\s+
        (?P<x1>[0-9]+)(?:\s*,\s*|\s+)(?P<y1>[0-9]+)
        (?:\s+(?P<x2>[0-9]+)(?:\s*,\s*|\s+)(?P<y2>[0-9]+))?$",
    )
    .unwrap()
});

static MULTI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:multi|multishot|double)\s+(?P<dir>\w+)$").unwrap()
});

type Game = LocalMatch<RandomStrategy>;

fn main() -> io::Result<()> {
    let matches = App::new("Battleship")
        .version("1.0")
        .author("Zachary Stewart <zachary@zstewart.com>")
        .about("Command line battleship against the computer, with abilities and mines.")
        .arg(
            Arg::with_name("seed")
                .short("s")
                .long("seed")
                .value_name("SEED")
                .help("seed for every random decision in the match")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("rules")
                .short("r")
                .long("rules")
                .value_name("FILE")
                .help("load the board size and ships from a JSON ruleset")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("abilities")
                .short("a")
                .long("abilities")
                .help("let the computer use special abilities too"),
        )
        .get_matches();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let rules = Arc::new(load_rules(&matches)?);
    let seed = if matches.is_present("seed") {
        value_t!(matches, "seed", u64).unwrap_or_else(|e| e.exit())
    } else {
        rand::random()
    };
    info!(seed, "starting match");

    let mut strategy = RandomStrategy::new(seed.wrapping_add(1));
    if matches.is_present("abilities") {
        strategy = strategy.with_abilities();
    }
    let mut game = LocalMatch::new(rules, seed, strategy);
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(2));

    let stdin = io::stdin();
    let mut input = InputReader::new(stdin.lock());

    loop {
        let phase = game.session().state().phase();
        match phase {
            Phase::Placing => {
                let fleet = choose_placements(game.rules(), &mut rng, &mut input)?;
                match game.submit(Intent::Place(fleet)) {
                    Ok(update) => report(&game, &update),
                    Err(err) => println!("Fleet rejected: {}", err),
                }
            }
            Phase::Battle => play_turn(&mut game, &mut input)?,
            Phase::Result => {
                show_result(&game);
                let accept = input.read_input_lower("Play again? (Y/n)", |input| match input {
                    "yes" | "y" | "" => Some(true),
                    "no" | "n" => Some(false),
                    _ => None,
                })?;
                if let Ok(update) = game.submit(Intent::Rematch { accept }) {
                    report(&game, &update);
                }
            }
            Phase::Waiting | Phase::Leave => break,
        }
    }
    println!("Thanks for playing.");
    Ok(())
}

/// Load the ruleset named on the command line, or the standard one.
fn load_rules(matches: &ArgMatches) -> io::Result<Ruleset> {
    match matches.value_of("rules") {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            Ruleset::from_json(&json).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
        }
        None => Ok(Ruleset::standard()),
    }
}

/// Name a ship for the player: the type name, numbered when there are several.
fn ship_name(rules: &Ruleset, ship: ShipIndex) -> String {
    let instance = &rules.ships()[ship];
    let ty = &rules.ship_types()[instance.kind];
    if ty.amount > 1 {
        format!("{}{}", ty.name, instance.ordinal + 1)
    } else {
        ty.name.clone()
    }
}

/// Two-letter label for a ship on the board.
fn ship_abbrev(rules: &Ruleset, ship: ShipIndex) -> String {
    rules
        .ship_type(ship)
        .map(|ty| ty.name.chars().take(2).collect())
        .unwrap_or_default()
}

/// Find a ship by name or number.
fn parse_ship(rules: &Ruleset, name: &str) -> Option<ShipIndex> {
    if let Ok(idx) = name.parse::<usize>() {
        return Some(idx).filter(|&idx| idx < rules.ship_count());
    }
    (0..rules.ship_count()).find(|&ship| {
        let full = ship_name(rules, ship);
        let unique = rules.ship_types()[rules.ships()[ship].kind].amount == 1;
        full == name || (unique && ship_abbrev(rules, ship) == name)
    })
}

fn parse_direction(dir: &str) -> Option<Orientation> {
    match dir {
        "up" | "north" | "u" | "n" => Some(Orientation::Up),
        "down" | "south" | "d" | "s" => Some(Orientation::Down),
        "left" | "west" | "l" | "w" => Some(Orientation::Left),
        "right" | "east" | "r" | "e" => Some(Orientation::Right),
        _ => None,
    }
}

/// Parse a coordinate and make sure it is on the board.
fn parse_cell(rules: &Ruleset, x: &str, y: &str) -> Option<usize> {
    let coord = Coordinate::new(x.parse().ok()?, y.parse().ok()?);
    let cell = rules.dimensions().try_linearize(&coord);
    if cell.is_none() {
        let dim = rules.dimensions();
        println!(
            "({}, {}) is off the board; x must be below {} and y below {}",
            coord.x,
            coord.y,
            dim.width(),
            dim.height()
        );
    }
    cell
}

/// Choose placements for all ships using input from the player.
fn choose_placements(
    rules: &Ruleset,
    rng: &mut StdRng,
    input: &mut InputReader<impl BufRead>,
) -> io::Result<FleetSubmission> {
    enum Command {
        Done,
        Place(ShipIndex, Coordinate, Orientation),
        Unplace(ShipIndex),
        Clear,
        RandomizeRest,
        Help,
    }
    let mut draft = FleetDraft::new(rules);
    println!();
    println!("Place ships. Type help or ? for commands.");
    loop {
        println!();
        if draft.ready() {
            println!("All ships placed, type done to start the game");
        } else {
            let pending: Vec<_> = draft
                .pending_ships()
                .map(|ship| ship_name(rules, ship))
                .collect();
            println!("Remaining ships to place: {}", pending.join(", "));
        }
        println!("Your current board setup:");
        show_board(rules, |cell| match draft.ship_at(cell) {
            Some(ship) => ship_abbrev(rules, ship),
            None => "~~".to_string(),
        });
        println!();

        let cmd = input.read_input_lower(">", |input| match input {
            "?" | "help" | "h" => Some(Command::Help),
            "randomize" | "rand" | "random" => Some(Command::RandomizeRest),
            "done" | "start" => Some(Command::Done),
            "clear" => Some(Command::Clear),
            other => {
                if let Some(captures) = PLACE.captures(other) {
                    let ship = match parse_ship(rules, &captures["ship"]) {
                        Some(ship) => ship,
                        None => {
                            println!("invalid ship: {}", &captures["ship"]);
                            return None;
                        }
                    };
                    let dir = match parse_direction(&captures["dir"]) {
                        Some(dir) => dir,
                        None => {
                            println!("invalid direction {}, choose \"up\", \"down\", \"left\", or \"right\"", &captures["dir"]);
                            return None;
                        }
                    };
                    let cell = parse_cell(rules, &captures["x"], &captures["y"])?;
                    Some(Command::Place(ship, rules.dimensions().un_linearize(cell), dir))
                } else if let Some(captures) = UNPLACE.captures(other) {
                    if &captures["ship"] == "all" {
                        return Some(Command::Clear);
                    }
                    match parse_ship(rules, &captures["ship"]) {
                        Some(ship) => Some(Command::Unplace(ship)),
                        None => {
                            println!("invalid ship: {}", &captures["ship"]);
                            None
                        }
                    }
                } else {
                    println!("Invalid ship-placement command \"{}\". Use '?' for help", other);
                    None
                }
            }
        })?;

        match cmd {
            Command::Done => match draft.submission() {
                Some(fleet) => return Ok(fleet),
                None => println!("You must place all your ships first!"),
            },
            Command::Place(ship, pivot, dir) => {
                if let Err(err) = draft.place(ship, ShipPose::new(pivot, dir)) {
                    match err.reason() {
                        CannotPlaceReason::Overlap => {
                            println!("Invalid placement: overlaps existing ship.")
                        }
                        CannotPlaceReason::OutOfBounds => {
                            println!("Invalid placement: not enough space on the board.")
                        }
                        _ => println!("Invalid placement: {}", err),
                    }
                }
            }
            Command::Unplace(ship) => {
                draft.unplace(ship);
            }
            Command::Clear => draft.clear(),
            Command::RandomizeRest => randomize_rest(rules, &mut draft, rng),
            Command::Help => {
                println!(
                    "Available Commands:
    done                        if all ships are placed, start the game.
    place <ship> <x>,<y> <dir>  place the ship with its pivot at the given coordinate, facing
        \"up\", \"down\", \"left\", or \"right\". Ships extend right and down when facing right.
    unplace <ship>              clear the placement of the specified ship, or \"all\".
    clear                       clears all ship placements.
    randomize                   randomize the placements of the remaining ships."
                );
                println!();
                println!("Available Ships:");
                for ship in 0..rules.ship_count() {
                    let ty = &rules.ship_types()[rules.ships()[ship].kind];
                    let kind = if ty.bomb { "mine" } else { "ship" };
                    println!(
                        "    {:>2} {:<12} ({}, {} cells)",
                        ship,
                        ship_name(rules, ship),
                        kind,
                        ty.footprint.len()
                    );
                }
            }
        }
    }
}

/// Place every pending ship at a random free spot.
fn randomize_rest(rules: &Ruleset, draft: &mut FleetDraft, rng: &mut StdRng) {
    let dim = rules.dimensions();
    let pending: Vec<_> = draft.pending_ships().collect();
    for ship in pending {
        let mut poses: Vec<ShipPose> = (0..dim.total_size())
            .flat_map(|cell| {
                let pivot = dim.un_linearize(cell);
                (0..4)
                    .filter_map(Orientation::from_index)
                    .map(move |dir| ShipPose::new(pivot, dir))
            })
            .collect();
        poses.shuffle(rng);
        if !poses.into_iter().any(|pose| draft.place(ship, pose).is_ok()) {
            println!("No room left for the {}.", ship_name(rules, ship));
        }
    }
}

/// One command from the player during battle.
fn play_turn(game: &mut Game, input: &mut InputReader<impl BufRead>) -> io::Result<()> {
    enum Command {
        Fire(Vec<usize>),
        Ability(AbilityRequest),
        Leave,
        Help,
    }
    show_battle(game);
    let rules = game.rules().clone();
    let cmd = input.read_input_lower("Your move:", |input| match input {
        "?" | "help" | "h" => Some(Command::Help),
        "stun" => Some(Command::Ability(AbilityRequest::Stun)),
        "scan" => Some(Command::Ability(AbilityRequest::Scan)),
        "reveal" => Some(Command::Ability(AbilityRequest::Reveal)),
        "leave" | "quit" | "exit" => Some(Command::Leave),
        other => {
            if let Some(captures) = FIRE.captures(other) {
                let mut targets = vec![parse_cell(&rules, &captures["x1"], &captures["y1"])?];
                if let (Some(x), Some(y)) = (captures.name("x2"), captures.name("y2")) {
                    targets.push(parse_cell(&rules, x.as_str(), y.as_str())?);
                }
                Some(Command::Fire(targets))
            } else if let Some(captures) = MULTI.captures(other) {
                match parse_direction(&captures["dir"]) {
                    Some(direction) => Some(Command::Ability(AbilityRequest::Multishot { direction })),
                    None => {
                        println!("invalid direction {}", &captures["dir"]);
                        None
                    }
                }
            } else {
                println!("Invalid command \"{}\". Use '?' for help", other);
                None
            }
        }
    })?;
    let intent = match cmd {
        Command::Fire(targets) => Intent::Fire(targets),
        Command::Ability(request) => Intent::UseAbility(request),
        Command::Leave => Intent::Leave,
        Command::Help => {
            println!(
                "Available Commands:
    fire <x>,<y>            fire at the given cell of the enemy board.
    fire <x>,<y> <x>,<y>    fire at two adjacent cells after arming a multi-shot.
    stun                    the enemy loses their next turn when you next miss.
    scan                    count the ships under a random unexplored patch of the enemy board.
    reveal                  reveal one enemy ship cell.
    multi <dir>             arm a two-cell volley stepping up, down, left or right.
    leave                   give up and leave.
Each ability can be used once per battle. Hitting a mine costs you your next turn."
            );
            return Ok(());
        }
    };
    match game.submit(intent) {
        Ok(update) if update.is_empty() => println!("Nothing happened."),
        Ok(update) => report(game, &update),
        Err(err) => println!("{}", err),
    }
    Ok(())
}

/// Print a description of everything in the update.
fn report(game: &Game, update: &Update) {
    let rules = game.rules();
    let dim = rules.dimensions();
    let human = game.human();
    let who = |player: &PlayerId| if player == human { "You" } else { "The enemy" };
    let view = game.target_view();
    let own = game.session().layout_of(human);
    for change in update.changes.iter() {
        match change {
            Change::ShotCell { player, cell, .. } => {
                let coord = dim.un_linearize(*cell);
                let result = if player == human {
                    match view.get(*cell) {
                        Some(CellView::Hit) => "hit!",
                        Some(CellView::Bomb) => "a mine!",
                        _ => "miss.",
                    }
                } else {
                    match own.and_then(|layout| layout.ship_at(*cell)) {
                        Some(ship) if rules.is_bomb(ship) => "a mine!",
                        Some(_) => "hit!",
                        None => "miss.",
                    }
                };
                println!("{} fired at ({}, {}): {}", who(player), coord.x, coord.y, result);
            }
            Change::Winner(Some(winner)) if winner == human => println!("You sank the enemy fleet!"),
            Change::Winner(Some(_)) => println!("Your fleet has been destroyed."),
            Change::Phase(Phase::Battle) => println!("Battle stations!"),
            Change::Phase(Phase::Placing) => println!("Boards cleared for a new round."),
            Change::TurnOwner(Some(owner)) if owner == human => println!("Your turn."),
            _ => {}
        }
    }
    for broadcast in update.broadcasts.iter() {
        match broadcast {
            Broadcast::Bomb { player } => println!("{} hit a mine and will lose a turn.", who(player)),
            Broadcast::Skip { player } => println!("{} lost a turn.", who(player)),
            Broadcast::Ability(event) => match &event.effect {
                Effect::Stun { target } => {
                    println!("{} used stun. {} will lose a turn.", who(&event.actor), who(target))
                }
                Effect::Scan {
                    region: Some(region),
                    ship_count,
                } if &event.actor == human => println!(
                    "Scan of {}x{} at ({}, {}): {} ship(s).",
                    region.width, region.height, region.origin.x, region.origin.y, ship_count
                ),
                Effect::Scan { region: None, .. } if &event.actor == human => {
                    println!("Scan found no unexplored area.")
                }
                Effect::Reveal { cell: Some(cell) } if &event.actor == human => {
                    let coord = dim.un_linearize(*cell);
                    println!("Revealed a ship at ({}, {}).", coord.x, coord.y);
                }
                Effect::Reveal { cell: None } if &event.actor == human => {
                    println!("Nothing left to reveal.")
                }
                Effect::Multishot { direction } if &event.actor == human => {
                    println!("Multi-shot armed facing {:?}.", direction)
                }
                _ => println!("{} used {:?}.", who(&event.actor), event.ability),
            },
        }
    }
}

/// Print both boards and the ability status.
fn show_battle(game: &Game) {
    let rules = game.rules();
    let state = game.session().state();
    let human = game.human();
    let view = game.target_view();
    println!();
    println!("Enemy waters:");
    show_board(rules, |cell| {
        let label = match view.get(cell) {
            Some(CellView::Hit) => "XX",
            Some(CellView::Miss) => "x",
            Some(CellView::Bomb) => "**",
            _ => "~~",
        };
        label.to_string()
    });
    println!();
    println!("Your fleet:");
    let layout = game.session().layout_of(human);
    let incoming = state.opponent(human).map(|enemy| enemy.shots());
    show_board(rules, |cell| {
        let shot = incoming.map_or(false, |shots| shots.is_marked(cell));
        match (layout.and_then(|layout| layout.ship_at(cell)), shot) {
            (Some(ship), true) => format!("x{}", ship_abbrev(rules, ship).chars().next().unwrap_or('?')),
            (Some(ship), false) => ship_abbrev(rules, ship),
            (None, true) => "x".to_string(),
            (None, false) => "~~".to_string(),
        }
    });
    if let (Some(me), Some(enemy)) = (state.player(human), state.opponent(human)) {
        println!();
        println!(
            "Turn {} | your health {} | enemy health {}",
            state.turn(),
            me.health(),
            enemy.health()
        );
        let unused: Vec<&str> = [
            ("stun", AbilityKind::Stun),
            ("scan", AbilityKind::Scan),
            ("reveal", AbilityKind::Reveal),
            ("multi", AbilityKind::Multishot),
        ]
        .iter()
        .filter(|(_, kind)| !me.has_used(*kind))
        .map(|(name, _)| *name)
        .collect();
        println!("Abilities left: {}", unused.join(", "));
        if let Some(dir) = me.armed() {
            println!("Multi-shot armed facing {:?}.", dir);
        }
    }
}

/// Print the enemy's fleet once the battle is decided.
fn show_result(game: &Game) {
    let rules = game.rules();
    let mut cells = vec![None; rules.dimensions().total_size()];
    if let Some(poses) = game.session().fleet_of(game.computer()) {
        for (ship, &pose) in poses.iter().enumerate() {
            for cell in occupied_cells(rules, ship, pose).unwrap_or_default() {
                cells[cell] = Some(ship);
            }
        }
    }
    let view = game.target_view();
    println!();
    println!("The enemy fleet was:");
    show_board(rules, |cell| match (cells[cell], view.get(cell)) {
        (Some(ship), Some(CellView::Hit)) | (Some(ship), Some(CellView::Bomb)) => {
            format!("x{}", ship_abbrev(rules, ship).chars().next().unwrap_or('?'))
        }
        (Some(ship), _) => ship_abbrev(rules, ship),
        (None, Some(CellView::Miss)) => "x".to_string(),
        (None, _) => "~~".to_string(),
    });
}

/// Show the board by printing the grid, top row first. `label` renders one cell.
fn show_board(rules: &Ruleset, mut label: impl FnMut(usize) -> String) {
    let dim = rules.dimensions();
    print!("   ");
    for x in 0..dim.width() {
        print!("{:^4}", x);
    }
    println!();
    for y in (0..dim.height()).rev() {
        print!("{:>2} ", y);
        for x in 0..dim.width() {
            let cell = Coordinate::new(x, y);
            let text = dim
                .try_linearize(&cell)
                .map(&mut label)
                .unwrap_or_default();
            print!("{:^4}", Cell(text));
        }
        println!();
    }
}

/// Display helper so cell labels are padded to the board's column width.
struct Cell(String);

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Helper to read input from the player.
struct InputReader<B> {
    read: B,
    buf: String,
}

impl<B> InputReader<B> {
    fn new(read: B) -> Self {
        Self {
            read,
            buf: String::new(),
        }
    }
}

impl<B: BufRead> InputReader<B> {
    /// Repeatedly tries to read input until the input checker returns `Some`. Converts
    /// to ascii lower before running the checker.
    fn read_input_lower<F, T>(&mut self, prompt: &str, mut checker: F) -> io::Result<T>
    where
        F: FnMut(&str) -> Option<T>,
    {
        loop {
            self.read_input_inner(prompt)?;
            self.buf.make_ascii_lowercase();
            if let Some(val) = checker(self.buf.trim()) {
                return Ok(val);
            }
        }
    }

    /// Helper to print the prompt, clear the string buffer and read a line.
    fn read_input_inner(&mut self, prompt: &str) -> io::Result<()> {
        print!("{} ", prompt);
        io::stdout().flush()?;
        self.buf.clear();
        if self.read.read_line(&mut self.buf)? == 0 {
            println!();
            std::process::exit(0);
        }
        Ok(())
    }
}
