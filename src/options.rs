//! Turn order-sensitive command-line options into export specs.
//!
//! `--collection`, `--calendars` and `--contacts` modify whichever exporter
//! was added before them, so the options are replayed in the order they
//! appeared rather than grouped by name.

use anyhow::{Result, bail};
use calexport_core::{ExportSpec, ExportType};
use clap::ArgMatches;

/// An option whose position on the command line matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderedArg {
    Uid(String),
    Record(String),
    User(String),
    Collection(String),
    Calendars,
    Contacts,
}

/// Collect the order-sensitive options from parsed matches, sorted by position.
pub fn ordered_args(matches: &ArgMatches) -> Vec<OrderedArg> {
    let mut args: Vec<(usize, OrderedArg)> = Vec::new();

    let valued: [(&str, fn(String) -> OrderedArg); 4] = [
        ("uid", OrderedArg::Uid),
        ("record", OrderedArg::Record),
        ("user", OrderedArg::User),
        ("collection", OrderedArg::Collection),
    ];
    for (id, make) in valued {
        if let (Some(indices), Some(values)) =
            (matches.indices_of(id), matches.get_many::<String>(id))
        {
            args.extend(indices.zip(values.cloned().map(make)));
        }
    }

    for (id, arg) in [
        ("calendars", OrderedArg::Calendars),
        ("contacts", OrderedArg::Contacts),
    ] {
        if let Some(indices) = matches.indices_of(id) {
            args.extend(indices.map(|i| (i, arg.clone())));
        }
    }

    args.sort_by_key(|(index, _)| *index);
    args.into_iter().map(|(_, arg)| arg).collect()
}

/// Accumulates exporters as options are replayed.
#[derive(Debug, Default)]
pub struct SpecBuilder {
    specs: Vec<ExportSpec>,
    all_type: ExportType,
}

impl SpecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, arg: OrderedArg) -> Result<()> {
        match arg {
            OrderedArg::Uid(uid) => self.specs.push(ExportSpec::uid(&uid)),
            OrderedArg::Record(record) => match ExportSpec::from_record_name(&record) {
                Some(spec) => self.specs.push(spec),
                None => bail!("Invalid record '{record}': expected TYPE:SHORTNAME"),
            },
            OrderedArg::User(user) => self.specs.push(ExportSpec::record("users", &user)),
            OrderedArg::Collection(name) => match self.specs.last_mut() {
                Some(spec) => spec.collections.push(name),
                None => bail!("--collection '{name}' must follow --uid, --record or --user"),
            },
            OrderedArg::Calendars => self.set_type(ExportType::Calendar),
            OrderedArg::Contacts => self.set_type(ExportType::AddressBook),
        }
        Ok(())
    }

    fn set_type(&mut self, export_type: ExportType) {
        match self.specs.last_mut() {
            Some(spec) => spec.export_type = export_type,
            None => self.all_type = export_type,
        }
    }

    /// The explicit exporters in order, followed by an all-homes exporter when `all` is set.
    pub fn finish(mut self, all: bool) -> Vec<ExportSpec> {
        if all {
            self.specs.push(ExportSpec::all_homes(self.all_type));
        }
        self.specs
    }
}

/// Replay `args` into a spec list.
pub fn build_specs(args: Vec<OrderedArg>, all: bool) -> Result<Vec<ExportSpec>> {
    let mut builder = SpecBuilder::new();
    for arg in args {
        builder.apply(arg)?;
    }
    Ok(builder.finish(all))
}
