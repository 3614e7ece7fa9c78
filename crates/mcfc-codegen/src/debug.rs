//! Runtime logging through the `debug` component.

use crate::cmd;
use crate::compiler::Compiler;
use crate::display::TextPart;
use crate::types::CALL;
use crate::value::{Capabilities, Kind};
use mcfc_types::Site;

impl Compiler {
    /// Log `item` at run time.
    ///
    /// The item lands in `call.m0` and `debug.log` prints it. With
    /// `include_src`, `debug.log_src` then receives the call site as
    /// `m0` (file), `m1` (line) and `m2` (enclosing entry or function).
    #[track_caller]
    pub fn log<'a>(&mut self, item: impl Into<TextPart<'a>>, include_src: bool) {
        let site = Site::caller();
        let l = self.layout.clone();
        let m0 = l.call_arg(0);
        match item.into() {
            TextPart::Literal(text) => self.emit(cmd::set_value(&m0, &cmd::quote(text))),
            TextPart::Value(value) => {
                if !self.check_live(value, &site) {
                    return;
                }
                if value.kind() == Kind::Float {
                    self.extract_float(value, &m0);
                } else {
                    let lines = value.move_out(&l, &m0);
                    self.emit_all(lines);
                }
            }
        }
        let Some(log) = self.library("debug.log", &site) else {
            return;
        };
        self.emit(cmd::call(&log));
        if !include_src {
            return;
        }
        let Some(log_src) = self.library("debug.log_src", &site) else {
            return;
        };
        let name = self.emitter.enclosing_label().unwrap_or("<top>").to_string();
        let file = site.file.replace('\\', "/");
        self.emit(cmd::set_value(&m0, &cmd::quote(&file)));
        self.emit(cmd::set_value(&l.call_arg(1), &cmd::quote(&site.line.to_string())));
        self.emit(cmd::set_value(&l.call_arg(2), &cmd::quote(&name)));
        self.emit(cmd::call_with(&log_src, &l.at(CALL)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcfc_linker::MemoryDatabase;
    use mcfc_types::{Config, ErrorCode};

    fn debug_db() -> MemoryDatabase {
        MemoryDatabase::new()
            .component("debug", r#"{"namespace": "debug"}"#)
            .procedure("debug", "log", "say log")
            .procedure("debug", "log_src", "$say $(m0):$(m1) $(m2)")
    }

    #[test]
    fn test_log_value_without_source() {
        let mut cx = Compiler::with_database(Config::with_namespace("t"), &debug_db()).unwrap();
        cx.entry("main", |cx| {
            let n = cx.text("hello");
            cx.log(&n, false);
            cx.log("plain", false);
        });
        let out = cx.finish().unwrap();
        let main = out.procedure("t:main").unwrap();
        assert_eq!(
            main.lines[1..5],
            [
                "data modify storage t:mcf call.m0 set from storage t:mcf mem.v0",
                "function t:lib/debug/log",
                r#"data modify storage t:mcf call.m0 set value "plain""#,
                "function t:lib/debug/log",
            ]
        );
    }

    #[test]
    fn test_log_with_source_names_call_site() {
        let mut cx = Compiler::with_database(Config::with_namespace("t"), &debug_db()).unwrap();
        let line = line!() + 1;
        cx.entry("greet", |cx| cx.log("hi", true));
        let out = cx.finish().unwrap();
        let main = out.procedure("t:greet").unwrap();
        let file = file!().replace('\\', "/");
        assert_eq!(
            main.lines[2..6],
            [
                format!("data modify storage t:mcf call.m0 set value \"{file}\""),
                format!("data modify storage t:mcf call.m1 set value \"{line}\""),
                r#"data modify storage t:mcf call.m2 set value "greet""#.to_string(),
                "function t:lib/debug/log_src with storage t:mcf call".to_string(),
            ]
        );
    }

    #[test]
    fn test_log_without_component_is_reported() {
        let mut cx = Compiler::new(Config::with_namespace("t"));
        cx.entry("main", |cx| cx.log("x", true));
        let failure = cx.finish().unwrap_err();
        assert_eq!(failure.errors.errors.len(), 1);
        assert_eq!(failure.errors.errors[0].code, ErrorCode::UNKNOWN_COMPONENT);
    }
}
