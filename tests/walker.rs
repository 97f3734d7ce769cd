mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::*;
use hpkg_reader::hpkg::format::toc::{parse_attribute_types, parse_strings};
use hpkg_reader::hpkg::format::walker::{AttributeTreeWalker, WalkStats};
use hpkg_reader::hpkg::handlers::root::RootHandler;
use hpkg_reader::hpkg::handlers::{AttributeHandler, BoxedHandler, Finished, HandlerContext};
use hpkg_reader::{
    AttributeType, AttributeValue, EntryCollector, ErrorKind, HpkgError, ReaderOptions, StringTable,
};

struct Tables {
    types: Vec<AttributeType>,
    strings: StringTable,
    tree: Vec<u8>,
}

fn tables(toc: &TocWriter) -> Tables {
    Tables {
        types: parse_attribute_types(&toc.types_section(), toc.type_count()).expect("types"),
        strings: parse_strings(&toc.strings_section(), toc.string_count()).expect("strings"),
        tree: toc.finished_tree(),
    }
}

fn collect(
    tables: &Tables,
    options: &ReaderOptions,
) -> (hpkg_reader::Result<()>, WalkStats, EntryCollector) {
    let mut collector = EntryCollector::new();
    let mut walker = AttributeTreeWalker::new(&tables.types, &tables.strings, 1 << 20, options);
    let result = {
        let mut context = HandlerContext::new(&mut collector, options);
        walker.walk(&tables.tree, Box::new(RootHandler), &mut context)
    };
    (result, walker.stats(), collector)
}

fn assert_balanced(stats: &WalkStats) {
    assert_eq!(
        stats.pushed,
        stats.finalized + stats.released,
        "unbalanced handler stack: {:?}",
        stats
    );
}

#[test]
fn successful_walk_finalizes_every_handler() {
    let mut toc = TocWriter::new();
    toc.begin_entry("bin");
    toc.uint("file:type", 1, false);
    toc.begin_entry("tool").uint("file:permissions", 0o755, false).end();
    toc.leaf_entry("empty");
    toc.end();
    toc.leaf_entry("README");

    let tables = tables(&toc);
    let (result, stats, collector) = collect(&tables, &ReaderOptions::default());
    result.expect("walk");

    assert_balanced(&stats);
    assert_eq!(stats.released, 0);
    // root, bin, tool
    assert_eq!(stats.pushed, 3);
    assert_eq!(stats.max_depth, 3);

    let paths: Vec<&str> = collector.entries().iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, ["bin", "bin/tool", "bin/empty", "README"]);
    assert!(collector.entries().iter().all(|e| e.complete));
}

#[test]
fn invalid_entry_name_unwinds_all_handlers() {
    for bad_name in ["..", ".", "", "a/b"] {
        let mut toc = TocWriter::new();
        toc.begin_entry("outer");
        toc.begin_entry("inner");
        // Inline, since an empty string cannot live in the string table
        toc.string("dir:entry", bad_name, false);
        toc.end();
        toc.end();

        let tables = tables(&toc);
        let (result, stats, collector) = collect(&tables, &ReaderOptions::default());
        let err = result.expect_err("invalid name accepted");

        assert_eq!(err.kind(), ErrorKind::MalformedData, "name {:?}: {}", bad_name, err);
        assert!(
            matches!(err, HpkgError::AtLevel { level: 3, .. }),
            "name {:?}: {:?}",
            bad_name,
            err
        );
        assert_balanced(&stats);
        assert_eq!(stats.released, 3, "root, outer and inner released");
        assert!(collector.entries().iter().all(|e| !e.complete));
    }
}

#[test]
fn top_level_dot_dot_is_rejected() {
    let mut toc = TocWriter::new();
    toc.leaf_entry("..");
    let tables = tables(&toc);
    let (result, stats, _) = collect(&tables, &ReaderOptions::default());
    assert_eq!(result.unwrap_err().kind(), ErrorKind::MalformedData);
    assert_balanced(&stats);
    assert_eq!(stats.released, 1);
}

#[test]
fn nesting_beyond_limit_is_rejected() {
    let mut toc = TocWriter::new();
    for depth in 0..5 {
        toc.begin_entry(&format!("level{}", depth));
    }
    for _ in 0..5 {
        toc.end();
    }
    let tables = tables(&toc);

    let (result, stats, _) = collect(&tables, &ReaderOptions::default().with_max_tree_depth(6));
    result.expect("root plus five levels fits in six");
    assert_eq!(stats.max_depth, 6);

    let (result, stats, _) = collect(&tables, &ReaderOptions::default().with_max_tree_depth(5));
    assert_eq!(result.unwrap_err().kind(), ErrorKind::MalformedData);
    assert_balanced(&stats);
}

#[test]
fn bytes_after_root_terminator_are_rejected() {
    let mut toc = TocWriter::new();
    toc.leaf_entry("a");
    let mut tables = tables(&toc);
    tables.tree.push(0);

    let (result, stats, _) = collect(&tables, &ReaderOptions::default());
    assert_eq!(result.unwrap_err().kind(), ErrorKind::MalformedData);
    assert_balanced(&stats);
}

#[test]
fn missing_root_terminator_is_rejected() {
    let mut toc = TocWriter::new();
    toc.begin_entry("a").end();
    let mut tables = tables(&toc);
    tables.tree.pop();

    let (result, stats, _) = collect(&tables, &ReaderOptions::default());
    assert_eq!(result.unwrap_err().kind(), ErrorKind::MalformedData);
    assert_eq!(stats.released, 1);
    assert_balanced(&stats);
}

#[test]
fn type_index_out_of_range_is_rejected() {
    let mut toc = TocWriter::new();
    toc.leaf_entry("a");
    let mut tables = tables(&toc);
    let type_count = tables.types.len() as u64;
    tables.tree.pop();
    leb128(tag(type_count, 0, false), &mut tables.tree);
    tables.tree.push(0);

    let (result, _, _) = collect(&tables, &ReaderOptions::default());
    assert_eq!(result.unwrap_err().kind(), ErrorKind::MalformedData);
}

#[test]
fn unknown_subtrees_are_skipped() {
    let mut toc = TocWriter::new();
    toc.string("vendor:blob", "x", true);
    // Looks like an entry, but lives inside an ignored subtree
    toc.begin_entry("hidden").leaf_entry("deeper").end();
    toc.end();
    toc.begin_entry("visible");
    toc.uint("vendor:flags", 3, true).uint("vendor:flag", 1, false).end();
    toc.end();

    let tables = tables(&toc);
    let (result, stats, collector) = collect(&tables, &ReaderOptions::default());
    result.expect("walk");
    assert_balanced(&stats);

    let paths: Vec<&str> = collector.entries().iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, ["visible"]);
}

type Log = Rc<RefCell<Vec<(usize, &'static str)>>>;

/// Spawns a tracking child for every attribute and logs how each one ends.
///
/// A child for the value `"doomed"` fails its own finalize.
struct Tracking {
    id: usize,
    doomed: bool,
    next_id: Rc<RefCell<usize>>,
    log: Log,
}

impl Tracking {
    fn root(log: &Log) -> Tracking {
        Tracking {
            id: 0,
            doomed: false,
            next_id: Rc::default(),
            log: log.clone(),
        }
    }

    fn spawn(&self, doomed: bool) -> Tracking {
        let mut next = self.next_id.borrow_mut();
        *next += 1;
        Tracking {
            id: *next,
            doomed,
            next_id: self.next_id.clone(),
            log: self.log.clone(),
        }
    }
}

impl<'a> AttributeHandler<'a, ()> for Tracking {
    fn kind(&self) -> &'static str {
        "tracking"
    }

    fn handle_child(
        &mut self,
        _context: &mut HandlerContext<'_, ()>,
        attribute: &'a AttributeType,
        value: AttributeValue<'a>,
    ) -> hpkg_reader::Result<Option<BoxedHandler<'a, ()>>> {
        if value == AttributeValue::String("fail") {
            return Err(HpkgError::Handler(format!("refusing '{}'", attribute.name)));
        }
        let child: BoxedHandler<'a, ()> =
            Box::new(self.spawn(value == AttributeValue::String("doomed")));
        Ok(Some(child))
    }

    fn finalize(&mut self, _context: &mut HandlerContext<'_, ()>) -> hpkg_reader::Result<Finished> {
        if self.doomed {
            return Err(HpkgError::Handler(format!("cannot finish #{}", self.id)));
        }
        self.log.borrow_mut().push((self.id, "finalize"));
        Ok(Finished::Nothing)
    }

    fn release(self: Box<Self>, _context: &mut HandlerContext<'_, ()>) {
        self.log.borrow_mut().push((self.id, "release"));
    }
}

#[test]
fn every_handler_ends_exactly_once_on_failure() {
    let mut toc = TocWriter::new();
    toc.string("a", "1", true);
    toc.string("b", "2", false);
    toc.string("c", "3", true);
    toc.string("d", "fail", false);
    toc.end();
    toc.end();

    let tables = tables(&toc);
    let options = ReaderOptions::default();
    let log: Log = Rc::default();

    let mut walker = AttributeTreeWalker::new(&tables.types, &tables.strings, 0, &options);
    let mut sink = ();
    let mut context = HandlerContext::new(&mut sink, &options);
    let err = walker
        .walk(&tables.tree, Box::new(Tracking::root(&log)), &mut context)
        .expect_err("handler failure");

    assert!(matches!(err.root_cause(), HpkgError::Handler(_)), "{:?}", err);
    assert_eq!(err.kind(), ErrorKind::Handler);

    // root(0) -> a(1) -> [b(2) finalized as a leaf], c(3) -> d fails
    let log = log.borrow();
    assert_eq!(
        *log,
        [(2, "finalize"), (3, "release"), (1, "release"), (0, "release")]
    );
    assert_balanced(&walker.stats());
}

fn walk_tracking(toc: &TocWriter) -> (HpkgError, Vec<(usize, &'static str)>, WalkStats) {
    let tables = tables(toc);
    let options = ReaderOptions::default();
    let log: Log = Rc::default();
    let mut walker = AttributeTreeWalker::new(&tables.types, &tables.strings, 0, &options);
    let mut sink = ();
    let mut context = HandlerContext::new(&mut sink, &options);
    let err = walker
        .walk(&tables.tree, Box::new(Tracking::root(&log)), &mut context)
        .expect_err("finalize failure");
    let log = log.borrow().clone();
    (err, log, walker.stats())
}

#[test]
fn handler_failing_to_finalize_is_released() {
    // root(0) -> a(1) -> b(2, doomed), closing b fails
    let mut toc = TocWriter::new();
    toc.string("a", "1", true);
    toc.string("b", "doomed", true);
    toc.string("c", "3", false);
    toc.end();
    toc.end();

    let (err, log, stats) = walk_tracking(&toc);
    assert!(matches!(err.root_cause(), HpkgError::Handler(_)), "{:?}", err);
    assert_eq!(log, [(3, "finalize"), (2, "release"), (1, "release"), (0, "release")]);
    assert_eq!(stats.finalized, 0);
    assert_eq!(stats.released, 3);
    assert_balanced(&stats);
}

#[test]
fn leaf_failing_to_finalize_is_released() {
    let mut toc = TocWriter::new();
    toc.string("a", "1", false);
    toc.string("b", "doomed", false);

    let (err, log, stats) = walk_tracking(&toc);
    assert_eq!(err.kind(), ErrorKind::Handler);
    assert_eq!(log, [(1, "finalize"), (2, "release"), (0, "release")]);
    assert_eq!(stats.pushed, 1);
    assert_balanced(&stats);
}
