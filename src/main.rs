fn main() {
    snapsolve_lib::run()
}
