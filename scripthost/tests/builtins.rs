use scripthost::{Script, ScriptError};

fn runs(source: &str) {
    Script::new("dummy", source).unwrap();
}

fn rejected(source: &str) {
    assert!(
        matches!(Script::new("dummy", source), Err(ScriptError::Runtime(_))),
        "`{source}` should not be available inside the sandbox"
    );
}

#[test]
fn os_not_available() {
    rejected("os.clock()");
}

#[test]
fn io_not_available() {
    rejected("io.open(\"dummy.txt\")");
}

#[test]
fn base_core_available() {
    runs("assert(true)");
    runs("ipairs({})");
    runs("next({1,2,3,4}, 1)");
    runs("pairs({})");
    runs("select(1,2)");
    runs("tonumber(2)");
    runs("tostring(2)");
    runs("type(2)");
    runs("type(_G[\"tostring\"])");
    runs("type(_VERSION)");
}

#[test]
fn base_others_unavailable() {
    rejected("dofile(\"test.lua\")");
    rejected("load(\"return\")");
    rejected("loadfile(\"dummy.lua\")");
    rejected("print(1)");
    rejected("collectgarbage()");
    rejected("setmetatable({}, {})");
    rejected("getmetatable(\"\")");
    rejected("rawset({}, 1, 1)");
    rejected("pcall(function() end)");
}

#[test]
fn table_available() {
    runs("table.concat({\"A\",\"B\",\"C\"})");
    runs("table.insert({1,2,3,4}, 2)");
    runs("table.pack(1,2,3,4)");
    runs("table.unpack({1,2,3,4}, 1, 2)");
    runs("table.remove({1,2,3,4}, 1)");
    runs("table.move({1,2,3}, 2, 3, 1)");
    runs("table.sort({1,2,3,4})");
}

#[test]
fn string_available() {
    runs("string.byte(\"Hello World\")");
    runs("string.find(\"Hello World\", \"Hello\")");
    runs("string.format(\"%d: %s\", 1, \"Hello\")");
    runs("string.lower(\"Hello World\")");
}

#[test]
fn math_available() {
    runs("math.sin(1.234)");
    runs("math.sin(math.pi)");
    runs("math.ult(1, math.maxinteger)");
}

#[test]
fn utf8_available() {
    runs("utf8.char(32, 48)");
    runs("utf8.codes(\"Hello World\")");
    runs("utf8.len(\"Hello World\")");
}

#[test]
fn yield_is_installed_as_a_global() {
    runs("assert(type(yield) == \"function\")");
}

#[test]
fn require_is_installed_as_a_global() {
    runs("assert(type(require) == \"function\")");
}

#[test]
fn coroutine_library_is_hidden() {
    rejected("coroutine.create(function() end)");
}
