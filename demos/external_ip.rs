fn main() {
    match igd_forward::discover() {
        Err(ref err) => println!("{}", err),
        Ok(gateway) => match gateway.get_external_ip() {
            Err(ref err) => println!("{}", err),
            Ok(ext_addr) => {
                println!("Local gateway: {}, External ip address: {}", gateway, ext_addr);
                println!("Reconnect later with: {}", gateway.location());
            }
        },
    }
}
