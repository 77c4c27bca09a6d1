mod common;

use common::static_method;
use litstack::bytecode::{listing, Constant, FrameKind, Insn, Label, Opcode, VerificationType};
use litstack::{analyze_listing, Config, Error};
use std::fs;
use tempfile::tempdir;

#[test]
fn load_reads_listing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("method.lst");
    fs::write(&path, "# sum two constants\niconst_2\niconst_3\niadd\nireturn\n").unwrap();

    let insns = listing::load(&path).unwrap();
    assert_eq!(insns.len(), 4);
    assert_eq!(insns[2], Insn::simple(Opcode::Iadd));
}

#[test]
fn load_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    let err = listing::load(dir.path().join("absent.lst")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn parse_errors_report_line() {
    let err = listing::parse("iconst_1\nldc \"unterminated\nreturn").unwrap_err();
    assert!(matches!(err, Error::Listing { line: 2, .. }));

    let err = listing::parse("nop\nfield a/B.c I").unwrap_err();
    match err {
        Error::Listing { line, message } => {
            assert_eq!(line, 2);
            assert!(message.contains("unknown mnemonic"));
        }
        other => panic!("unexpected error {:?}", other),
    }

    let err = listing::parse("\n\nframe sideways {} {}").unwrap_err();
    assert!(matches!(err, Error::Listing { line: 3, .. }));
}

#[test]
fn member_references_and_escapes() {
    let insns = listing::parse(
        "getstatic java/lang/System.out Ljava/io/PrintStream;\n\
         ldc \"tab\\there \\u0041\"\n\
         invokeinterface java/util/List.size ()I\n\
         invokestatic a/Itf.helper ()V itf",
    )
    .unwrap();
    assert_eq!(
        insns[0],
        Insn::field(Opcode::Getstatic, "java/lang/System", "out", "Ljava/io/PrintStream;")
    );
    assert_eq!(insns[1], Insn::ldc(Constant::String("tab\there A".into())));
    assert!(matches!(&insns[2], Insn::Method { interface: true, .. }));
    assert!(matches!(&insns[3], Insn::Method { op: Opcode::Invokestatic, interface: true, .. }));
}

#[test]
fn frames_keep_their_kind() {
    let insns = listing::parse("L3:\nframe full {int, double} {null}").unwrap();
    assert_eq!(insns[0], Insn::Label(Label(3)));
    match &insns[1] {
        Insn::Frame(frame) => {
            assert_eq!(frame.kind, FrameKind::Full);
            assert_eq!(frame.locals, vec![VerificationType::Integer, VerificationType::Double]);
            assert_eq!(frame.stack, vec![VerificationType::Null]);
        }
        other => panic!("expected frame, got {:?}", other),
    }
}

#[test]
fn rendered_method_parses_back() {
    let source = "\
        L0:\n\
        iload_0\n\
        tableswitch 1 3 L4 L1 L2 L3\n\
        L1:\n\
        frame expanded {int} {}\n\
        ldc \"one\\n\"\n\
        areturn\n\
        L2:\n\
        frame expanded {int} {}\n\
        ldc -Infinityf\n\
        pop\n\
        L3:\n\
        frame expanded {int} {}\n\
        iinc 0 -1\n\
        L4:\n\
        frame expanded {int} {}\n\
        aconst_null\n\
        areturn";
    let insns = listing::parse(source).unwrap();
    let rendered = listing::render(&insns);
    assert!(rendered.contains("iload 0\n"));
    assert_eq!(listing::parse(&rendered).unwrap(), insns);
}

#[test]
fn analyze_listing_end_to_end() {
    let analysis = analyze_listing(
        &static_method(),
        "ldc 2.5d\nldc 4.0d\ndadd\ndstore 0\nreturn",
        &Config::default(),
    )
    .unwrap();
    assert_eq!(analysis.max_stack, 4);
    assert_eq!(analysis.max_locals, 2);
    assert_eq!(analysis.instructions.len(), 5);
}
